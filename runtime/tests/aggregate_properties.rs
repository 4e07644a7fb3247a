//! Aggregate invariants over arbitrary hand-out sequences.

#![allow(clippy::unwrap_used)]

use distribution_core::{
    Book, BookType, CatalogStore, Contribution, Language, Money, Points, Totals,
};
use distribution_runtime::LedgerService;
use distribution_testing::fixtures;
use distribution_testing::properties::{point_value, price};
use distribution_testing::{InMemoryStore, test_clock};
use proptest::prelude::*;
use std::sync::Arc;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn user_and_center_totals_match_the_log(
        hand_outs in prop::collection::vec((0usize..3, 0usize..3, price()), 0..40)
    ) {
        runtime().block_on(async {
            let store = Arc::new(InMemoryStore::new());
            let s = fixtures::seed(store.as_ref()).await;
            let ledger = LedgerService::from_store(Arc::clone(&store), Arc::new(test_clock()));

            let users = [&s.ravi, &s.sita, &s.gopal];
            let books = [&s.gita, &s.small, &s.mega];
            let mut expected = [Totals::default(); 3];

            for (who, what, paid) in &hand_outs {
                let book = books[*what];
                ledger
                    .record_distribution(users[*who].id, book.id, *paid)
                    .await
                    .unwrap();
                expected[*who].apply(&Contribution::assess(book, *paid));
            }

            for (user, want) in users.iter().zip(&expected) {
                let stored = store.user(user.id).await.unwrap().unwrap();
                assert_eq!(stored.totals, *want);
                let logged = hand_outs.iter().filter(|(who, _, _)| users[*who].id == user.id).count();
                assert_eq!(stored.distributions.len(), logged);
            }

            for center in [&s.center, &s.other_center] {
                let stored = store.center(center.id).await.unwrap().unwrap();
                let members = store.users_in_center(center.id).await.unwrap();
                let summed: Totals = members.iter().map(|u| u.totals).sum();
                assert_eq!(stored.totals, summed);
            }
        });
    }

    #[test]
    fn fractional_point_values_sum_exactly(
        catalog in prop::collection::vec((point_value(), price()), 1..5),
        picks in prop::collection::vec(any::<prop::sample::Index>(), 0..30),
    ) {
        runtime().block_on(async {
            let store = Arc::new(InMemoryStore::new());
            let s = fixtures::seed(store.as_ref()).await;
            let ledger = LedgerService::from_store(Arc::clone(&store), Arc::new(test_clock()));

            let mut books = Vec::new();
            for (i, (point, list_price)) in catalog.iter().enumerate() {
                let book = Book::new(&format!("Volume {i}"), BookType::Medium, Language::Telugu, *point, *list_price).unwrap();
                books.push(store.insert_book(book).await.unwrap());
            }

            let mut expected = Points::ZERO;
            for pick in &picks {
                let book = pick.get(&books);
                ledger.record_distribution(s.gopal.id, book.id, book.price).await.unwrap();
                expected += book.point;
            }

            let gopal = store.user(s.gopal.id).await.unwrap().unwrap();
            assert_eq!(gopal.totals.points, expected);
            assert_eq!(gopal.totals.donation, Money::ZERO);
            assert_eq!(gopal.totals.loss, Money::ZERO);
            let center = store.center(s.other_center.id).await.unwrap().unwrap();
            assert_eq!(center.totals.points, expected);
        });
    }

    #[test]
    fn donation_and_loss_are_never_both_positive(paid in price()) {
        let book = fixtures::book("Gita", distribution_core::BookType::Big, distribution_core::Language::English, 2, 100);
        let c = Contribution::assess(&book, paid);
        prop_assert!(c.donation == Money::ZERO || c.loss == Money::ZERO);
        prop_assert_eq!(paid - book.price, c.donation - c.loss);
    }
}
