//! A small seeded catalog shared by the test suites.

#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

use chrono::{DateTime, TimeZone, Utc};
use distribution_core::{
    Book, BookType, CatalogStore, Center, Language, Money, Points, Store, User,
};

/// Noon UTC on the given day.
#[must_use]
pub fn noon(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

/// A book with whole-rupee price and whole points.
#[must_use]
pub fn book(name: &str, book_type: BookType, language: Language, point: i64, price: i64) -> Book {
    Book::new(
        name,
        book_type,
        language,
        Points::from_whole(point),
        Money::from_rupees(price),
    )
    .unwrap()
}

/// What [`seed`] inserted.
#[derive(Clone, Debug)]
pub struct Seeded {
    /// "IYMF Panathur", with `ravi` and `sita`
    pub center: Center,
    /// "IYMF AECS", with `gopal`
    pub other_center: Center,
    /// Big, English, 2 points, ₹100
    pub gita: Book,
    /// Small, Hindi, 1 point, ₹30
    pub small: Book,
    /// Mega Big, English, 5 points, ₹400
    pub mega: Book,
    /// First user of `center`
    pub ravi: User,
    /// Second user of `center`
    pub sita: User,
    /// Only user of `other_center`
    pub gopal: User,
}

/// Inserts two centers, three books and three users.
pub async fn seed<S: Store>(store: &S) -> Seeded {
    let center = store
        .insert_center(Center::new("IYMF Panathur").unwrap())
        .await
        .unwrap();
    let other_center = store
        .insert_center(Center::new("IYMF AECS").unwrap())
        .await
        .unwrap();

    let gita = store
        .insert_book(book("Bhagavad Gita As It Is", BookType::Big, Language::English, 2, 100))
        .await
        .unwrap();
    let small = store
        .insert_book(book("Perfection of Yoga", BookType::Small, Language::Hindi, 1, 30))
        .await
        .unwrap();
    let mega = store
        .insert_book(book("Krishna Book", BookType::MegaBig, Language::English, 5, 400))
        .await
        .unwrap();

    let created = noon(2024, 3, 1);
    let ravi = store
        .insert_user(User::new("Ravi", "9000000001", center.id, created).unwrap())
        .await
        .unwrap();
    let sita = store
        .insert_user(User::new("Sita", "9000000002", center.id, created).unwrap())
        .await
        .unwrap();
    let gopal = store
        .insert_user(User::new("Gopal", "9000000003", other_center.id, created).unwrap())
        .await
        .unwrap();

    Seeded {
        center,
        other_center,
        gita,
        small,
        mega,
        ravi,
        sita,
        gopal,
    }
}
