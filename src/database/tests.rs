use sqlx::PgPool;
use tempfile::TempDir;

use crate::error::ServiceError;
use crate::models::{Account, Cafe, FollowState, Role};
use crate::token::TokenIssuer;
use crate::uploads::ImageStore;

use super::{AppState, DatabaseConnection};

async fn setup(pool: PgPool) -> (DatabaseConnection, TempDir) {
    let _ = env_logger::builder().is_test(true).try_init();

    let images = tempfile::tempdir().unwrap();
    let app_state = AppState::from_pool(
        pool,
        TokenIssuer::new(b"test-secret", chrono::Duration::minutes(30)),
        ImageStore::new(images.path()),
    )
    .await
    .unwrap();

    let db = DatabaseConnection {
        connection: app_state.pool.acquire().await.unwrap(),
    };
    (db, images)
}

fn account(username: &str) -> Account {
    Account {
        id: 0,
        name: "John".to_string(),
        last_name: "Doe".to_string(),
        email: format!("{username}@example.org"),
        username: username.to_string(),
        password_hash: vec![13u8; 32],
        password_salt: "saltsaltsalt".to_string(),
        role: Role::User,
    }
}

fn cafe(name: &str) -> Cafe {
    Cafe {
        id: 0,
        name: name.to_string(),
        address: Some("Calle 1".to_string()),
        latitude: 19.43,
        longitude: -99.13,
        image: None,
    }
}

#[sqlx::test(migrations = false)]
async fn test_account_crud(pool: PgPool) {
    let (mut db, _images) = setup(pool).await;

    let acc1 = db.store_account(account("johndoe")).await.unwrap();
    assert!(acc1.id != 0);
    assert_eq!(acc1.username, "johndoe");
    assert_eq!(acc1.role, Role::User);

    assert_eq!(db.get_account_by_id(acc1.id).await.unwrap(), Some(acc1.clone()));
    assert_eq!(
        db.get_account_by_username("johndoe").await.unwrap(),
        Some(acc1.clone())
    );
    assert_eq!(db.get_account_by_username("janedoe").await.unwrap(), None);

    let mut promoted = acc1.clone();
    promoted.role = Role::Admin;
    let promoted = db.store_account(promoted).await.unwrap();
    assert_eq!(promoted.id, acc1.id);
    assert_eq!(
        db.get_account_by_id(acc1.id).await.unwrap().map(|a| a.role),
        Some(Role::Admin)
    );

    let mut missing = account("ghost");
    missing.id = 4242;
    assert_eq!(
        db.store_account(missing).await,
        Err(ServiceError::NotFound("Account not found"))
    );
}

#[sqlx::test(migrations = false)]
async fn test_account_duplicates_conflict(pool: PgPool) {
    let (mut db, _images) = setup(pool).await;

    db.store_account(account("johndoe")).await.unwrap();

    let same_username = Account {
        email: "other@example.org".to_string(),
        ..account("johndoe")
    };
    assert!(matches!(
        db.store_account(same_username).await,
        Err(ServiceError::Conflict(_))
    ));

    let same_email = Account {
        username: "johnny".to_string(),
        ..account("johndoe")
    };
    assert!(matches!(
        db.store_account(same_email).await,
        Err(ServiceError::Conflict(_))
    ));
}

#[sqlx::test(migrations = false)]
async fn test_cafe_crud(pool: PgPool) {
    let (mut db, _images) = setup(pool).await;

    let central = db.store_cafe(cafe("Central")).await.unwrap();
    let norte = db.store_cafe(cafe("Norte")).await.unwrap();
    assert!(central.id != 0);
    assert!(norte.id > central.id);

    let all = db.get_all_cafes().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].cafe, central);
    assert_eq!(all[0].average_rating, 0.0);
    assert_eq!(all[0].opinion_count, 0);

    let renamed = Cafe {
        name: "Central Sur".to_string(),
        image: Some("abc.png".to_string()),
        ..central.clone()
    };
    let renamed = db.store_cafe(renamed).await.unwrap();
    assert_eq!(renamed.id, central.id);
    assert_eq!(
        db.get_cafe_by_id(central.id).await.unwrap().map(|c| c.cafe),
        Some(renamed.clone())
    );

    assert_eq!(db.delete_cafe(central.id).await.unwrap(), renamed);
    assert_eq!(db.get_cafe_by_id(central.id).await.unwrap(), None);
    assert_eq!(
        db.delete_cafe(central.id).await,
        Err(ServiceError::NotFound("Cafe not found"))
    );

    let missing = Cafe {
        id: 9999,
        ..cafe("Nowhere")
    };
    assert_eq!(
        db.store_cafe(missing).await,
        Err(ServiceError::NotFound("Cafe not found"))
    );
}

#[sqlx::test(migrations = false)]
async fn test_average_rating(pool: PgPool) {
    let (mut db, _images) = setup(pool).await;

    let ana = db.store_account(account("ana")).await.unwrap();
    let ben = db.store_account(account("ben")).await.unwrap();
    let eva = db.store_account(account("eva")).await.unwrap();
    let central = db.store_cafe(cafe("Central")).await.unwrap();

    db.store_opinion(ana.id, central.id, 5, "excelente").await.unwrap();
    db.store_opinion(ben.id, central.id, 4, "").await.unwrap();
    db.store_opinion(eva.id, central.id, 4, "bien").await.unwrap();

    let rated = db.get_cafe_by_id(central.id).await.unwrap().unwrap();
    assert_eq!(rated.opinion_count, 3);
    assert_eq!(rated.average_rating, 4.3);
}

#[sqlx::test(migrations = false)]
async fn test_opinions(pool: PgPool) {
    let (mut db, _images) = setup(pool).await;

    let ana = db.store_account(account("ana")).await.unwrap();
    let central = db.store_cafe(cafe("Central")).await.unwrap();

    let first = db.store_opinion(ana.id, central.id, 3, "ok").await.unwrap();
    let second = db.store_opinion(ana.id, central.id, 5, "mejor").await.unwrap();
    assert_eq!(first.username, "ana");
    assert_eq!(first.cafe_id, central.id);

    let opinions = db.get_opinions_by_cafe(central.id).await.unwrap();
    assert_eq!(opinions, vec![first, second]);

    assert_eq!(
        db.store_opinion(ana.id, central.id + 100, 4, "").await,
        Err(ServiceError::NotFound("Cafe not found"))
    );
    assert!(matches!(
        db.store_opinion(ana.id, central.id, 6, "").await,
        Err(ServiceError::BadRequest(_))
    ));
    assert_eq!(db.get_opinions_by_cafe(central.id + 100).await.unwrap(), vec![]);
}

#[sqlx::test(migrations = false)]
async fn test_stamp_once(pool: PgPool) {
    let (mut db, _images) = setup(pool).await;

    let ana = db.store_account(account("ana")).await.unwrap();
    let central = db.store_cafe(cafe("Central")).await.unwrap();

    let stamp = db.stamp_cafe(ana.id, central.id).await.unwrap();
    assert_eq!(stamp.account_id, ana.id);
    assert_eq!(stamp.cafe_id, central.id);

    assert_eq!(
        db.stamp_cafe(ana.id, central.id).await,
        Err(ServiceError::Conflict("You have already stamped this cafe"))
    );
    assert_eq!(
        db.stamp_cafe(ana.id, central.id + 100).await,
        Err(ServiceError::NotFound("Cafe not found"))
    );

    let stamps = db.get_stamps_by_account(ana.id).await.unwrap();
    assert_eq!(stamps.len(), 1);
    assert_eq!(stamps[0].cafe, central);
    assert_eq!(stamps[0].visited_at, stamp.visited_at);
}

#[sqlx::test(migrations = false)]
async fn test_passport_covers_catalog(pool: PgPool) {
    let (mut db, _images) = setup(pool).await;

    let ana = db.store_account(account("ana")).await.unwrap();
    let ben = db.store_account(account("ben")).await.unwrap();
    let central = db.store_cafe(cafe("Central")).await.unwrap();
    let norte = db.store_cafe(cafe("Norte")).await.unwrap();
    let sur = db.store_cafe(cafe("Sur")).await.unwrap();

    db.stamp_cafe(ana.id, norte.id).await.unwrap();
    db.stamp_cafe(ben.id, sur.id).await.unwrap();

    let passport = db.get_passport(ana.id).await.unwrap();
    assert_eq!(passport.len(), 3);
    assert_eq!(
        passport.iter().map(|p| p.cafe.id).collect::<Vec<_>>(),
        vec![central.id, norte.id, sur.id]
    );
    assert_eq!(
        passport.iter().map(|p| p.visited()).collect::<Vec<_>>(),
        vec![false, true, false]
    );

    let passport = db.get_passport(ben.id).await.unwrap();
    assert_eq!(passport.iter().filter(|p| p.visited()).count(), 1);
}

#[sqlx::test(migrations = false)]
async fn test_follow_toggle(pool: PgPool) {
    let (mut db, _images) = setup(pool).await;

    let ana = db.store_account(account("ana")).await.unwrap();
    let central = db.store_cafe(cafe("Central")).await.unwrap();

    assert_eq!(
        db.toggle_follow(ana.id, central.id).await.unwrap(),
        FollowState::Following
    );
    assert_eq!(db.get_followed_cafes(ana.id).await.unwrap(), vec![central.clone()]);

    assert_eq!(
        db.toggle_follow(ana.id, central.id).await.unwrap(),
        FollowState::NotFollowing
    );
    assert_eq!(db.get_followed_cafes(ana.id).await.unwrap(), vec![]);

    assert_eq!(
        db.toggle_follow(ana.id, central.id + 100).await,
        Err(ServiceError::NotFound("Cafe not found"))
    );
}

#[sqlx::test(migrations = false)]
async fn test_delete_cafe_cascades(pool: PgPool) {
    let (mut db, _images) = setup(pool).await;

    let ana = db.store_account(account("ana")).await.unwrap();
    let central = db.store_cafe(cafe("Central")).await.unwrap();

    db.stamp_cafe(ana.id, central.id).await.unwrap();
    db.toggle_follow(ana.id, central.id).await.unwrap();
    db.store_opinion(ana.id, central.id, 4, "").await.unwrap();

    db.delete_cafe(central.id).await.unwrap();

    assert_eq!(db.get_stamps_by_account(ana.id).await.unwrap(), vec![]);
    assert_eq!(db.get_followed_cafes(ana.id).await.unwrap(), vec![]);
    assert_eq!(db.get_passport(ana.id).await.unwrap(), vec![]);
    assert_eq!(db.get_opinions_by_cafe(central.id).await.unwrap(), vec![]);
}

#[sqlx::test(migrations = false)]
async fn test_unknown_account_not_found(pool: PgPool) {
    let (mut db, _images) = setup(pool).await;

    let central = db.store_cafe(cafe("Central")).await.unwrap();

    assert_eq!(
        db.stamp_cafe(4242, central.id).await,
        Err(ServiceError::NotFound("Account not found"))
    );
    assert_eq!(
        db.toggle_follow(4242, central.id).await,
        Err(ServiceError::NotFound("Account not found"))
    );
    assert_eq!(
        db.store_opinion(4242, central.id, 4, "rico").await,
        Err(ServiceError::NotFound("Account not found"))
    );
    assert_eq!(db.get_opinions_by_cafe(central.id).await.unwrap(), vec![]);
}
