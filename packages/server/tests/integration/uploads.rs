use serde_json::json;

use crate::common::{TestApp, TestUser, routes};

async fn owner_with_product(app: &TestApp) -> (TestUser, i32, i32) {
    let category = app.create_category("Panadería").await;
    let owner = app.create_user("rosa@lules.market").await;
    let created = app.create_business(&owner, "Doña Rosa", category).await;
    let product = app.create_product(&owner, "Facturas", category, false).await;
    (owner, created["id"].as_i64().unwrap() as i32, product)
}

mod presign {
    use super::*;

    #[tokio::test]
    async fn returns_a_key_in_the_callers_namespace() {
        let app = TestApp::spawn().await;
        let user = app.create_user("ana@lules.market").await;

        let res = app
            .post_with_token(
                routes::PRESIGN,
                &json!({"filename": "foto.jpg", "content_type": "image/jpeg", "size": 1000}),
                &user.token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let key = res.body["key"].as_str().unwrap();
        assert!(key.starts_with(&format!("uploads/{}/", user.id)), "{key}");
        assert!(key.ends_with(".jpg"));
        assert!(res.body["upload_url"].is_string());
        assert_eq!(res.body["expires_in"], 600);
    }

    #[tokio::test]
    async fn rejects_non_images() {
        let app = TestApp::spawn().await;
        let user = app.create_user("ana@lules.market").await;

        let res = app
            .post_with_token(
                routes::PRESIGN,
                &json!({"filename": "doc.pdf", "content_type": "application/pdf", "size": 1000}),
                &user.token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn rejects_oversized_files() {
        let app = TestApp::spawn().await;
        let user = app.create_user("ana@lules.market").await;

        let res = app
            .post_with_token(
                routes::PRESIGN,
                &json!({"filename": "foto.png", "content_type": "image/png", "size": 5 * 1024 * 1024}),
                &user.token,
            )
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn size_must_stay_below_the_limit() {
        let app = TestApp::spawn().await;
        let user = app.create_user("ana@lules.market").await;
        let presign = |size: u64| {
            json!({"filename": "foto.png", "content_type": "image/png", "size": size})
        };

        let at_limit = app
            .post_with_token(routes::PRESIGN, &presign(1024 * 1024), &user.token)
            .await;
        assert_eq!(at_limit.status, 400);
        assert_eq!(at_limit.body["code"], "VALIDATION_ERROR");

        let below = app
            .post_with_token(routes::PRESIGN, &presign(1024 * 1024 - 1), &user.token)
            .await;
        assert_eq!(below.status, 200, "{}", below.text);
    }
}

mod images {
    use super::*;

    #[tokio::test]
    async fn product_image_is_registered_and_counted() {
        let app = TestApp::spawn().await;
        let (owner, _, product) = owner_with_product(&app).await;
        let key = app.upload_object(&owner).await;

        let res = app
            .post_with_token(
                routes::IMAGES,
                &json!({"key": key, "owner": "product", "owner_id": product}),
                &owner.token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["owner_type"], "product");
        assert!(res.body["url"].as_str().unwrap().ends_with(&key));

        let detail = app.get_without_token(&routes::product(product)).await;
        assert_eq!(detail.body["images"].as_array().unwrap().len(), 1);
        let mine = app.get_with_token(routes::MY_BUSINESS, &owner.token).await;
        assert_eq!(mine.body["usage"]["images_used"], 1);
    }

    #[tokio::test]
    async fn free_plan_allows_one_image_per_product() {
        let app = TestApp::spawn().await;
        let (owner, _, product) = owner_with_product(&app).await;

        let first = app.upload_object(&owner).await;
        let res = app
            .post_with_token(
                routes::IMAGES,
                &json!({"key": first, "owner": "product", "owner_id": product}),
                &owner.token,
            )
            .await;
        assert_eq!(res.status, 201);

        let second = app.upload_object(&owner).await;
        let res = app
            .post_with_token(
                routes::IMAGES,
                &json!({"key": second, "owner": "product", "owner_id": product}),
                &owner.token,
            )
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PLAN_LIMIT_REACHED");
    }

    #[tokio::test]
    async fn key_must_exist_in_storage() {
        let app = TestApp::spawn().await;
        let (owner, _, product) = owner_with_product(&app).await;

        let presigned = app
            .post_with_token(
                routes::PRESIGN,
                &json!({"filename": "foto.png", "content_type": "image/png", "size": 10}),
                &owner.token,
            )
            .await;
        let key = presigned.body["key"].as_str().unwrap();

        let res = app
            .post_with_token(
                routes::IMAGES,
                &json!({"key": key, "owner": "product", "owner_id": product}),
                &owner.token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn another_users_key_is_rejected() {
        let app = TestApp::spawn().await;
        let (owner, _, product) = owner_with_product(&app).await;
        let intruder = app.create_user("otro@lules.market").await;
        let foreign_key = app.upload_object(&intruder).await;

        let res = app
            .post_with_token(
                routes::IMAGES,
                &json!({"key": foreign_key, "owner": "product", "owner_id": product}),
                &owner.token,
            )
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn new_logo_replaces_the_old_one() {
        let app = TestApp::spawn().await;
        let (owner, business_id, _) = owner_with_product(&app).await;

        let old_key = app.upload_object(&owner).await;
        let res = app
            .post_with_token(
                routes::IMAGES,
                &json!({"key": old_key, "owner": "business_logo", "owner_id": business_id}),
                &owner.token,
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);

        let new_key = app.upload_object(&owner).await;
        let res = app
            .post_with_token(
                routes::IMAGES,
                &json!({"key": new_key, "owner": "business_logo", "owner_id": business_id}),
                &owner.token,
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);

        assert!(app.store.get(&old_key).is_none());
        let mine = app.get_with_token(routes::MY_BUSINESS, &owner.token).await;
        assert!(
            mine.body["business"]["logo_url"]
                .as_str()
                .unwrap()
                .ends_with(&new_key)
        );
    }

    #[tokio::test]
    async fn deleting_an_image_removes_object_and_count() {
        let app = TestApp::spawn().await;
        let (owner, _, product) = owner_with_product(&app).await;
        let key = app.upload_object(&owner).await;
        let image = app
            .post_with_token(
                routes::IMAGES,
                &json!({"key": key, "owner": "product", "owner_id": product}),
                &owner.token,
            )
            .await
            .id();

        let res = app.delete_with_token(&routes::image(image), &owner.token).await;

        assert_eq!(res.status, 204, "{}", res.text);
        assert!(app.store.get(&key).is_none());
        let mine = app.get_with_token(routes::MY_BUSINESS, &owner.token).await;
        assert_eq!(mine.body["usage"]["images_used"], 0);
    }

    #[tokio::test]
    async fn content_moderator_can_delete_someone_elses_image() {
        let app = TestApp::spawn().await;
        let (owner, _, product) = owner_with_product(&app).await;
        let moderator = app
            .create_user_with_role("mod@lules.market", "moderator")
            .await;
        let stranger = app.create_user("otro@lules.market").await;
        let key = app.upload_object(&owner).await;
        let image = app
            .post_with_token(
                routes::IMAGES,
                &json!({"key": key, "owner": "product", "owner_id": product}),
                &owner.token,
            )
            .await
            .id();

        let denied = app
            .delete_with_token(&routes::image(image), &stranger.token)
            .await;
        assert_eq!(denied.status, 403);

        let res = app
            .delete_with_token(&routes::image(image), &moderator.token)
            .await;
        assert_eq!(res.status, 204);
    }

    #[tokio::test]
    async fn banned_owner_cannot_delete_images() {
        let app = TestApp::spawn().await;
        let (owner, _, product) = owner_with_product(&app).await;
        let moderator = app
            .create_user_with_role("mod@lules.market", "moderator")
            .await;
        let key = app.upload_object(&owner).await;
        let image = app
            .post_with_token(
                routes::IMAGES,
                &json!({"key": key, "owner": "product", "owner_id": product}),
                &owner.token,
            )
            .await
            .id();
        let ban = app
            .post_with_token(&routes::ban_user(owner.id), &json!({}), &moderator.token)
            .await;
        assert_eq!(ban.status, 200, "{}", ban.text);

        let res = app.delete_with_token(&routes::image(image), &owner.token).await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "ACCOUNT_BANNED");
        assert!(app.store.get(&key).is_some());
    }

    #[tokio::test]
    async fn orphaned_product_image_needs_content_permission() {
        let app = TestApp::spawn().await;
        let (owner, business_id, product) = owner_with_product(&app).await;
        let moderator = app
            .create_user_with_role("mod@lules.market", "moderator")
            .await;
        let key = app.upload_object(&owner).await;
        let image = app
            .post_with_token(
                routes::IMAGES,
                &json!({"key": key, "owner": "product", "owner_id": product}),
                &owner.token,
            )
            .await
            .id();
        // Product and business ids coincide, so a lookup that confused the
        // two would find the owner's own business.
        assert_eq!(product, business_id);
        app.exec_sql(&format!("DELETE FROM product WHERE id = {product}"))
            .await;

        let denied = app.delete_with_token(&routes::image(image), &owner.token).await;
        assert_eq!(denied.status, 403);
        assert_eq!(denied.body["code"], "PERMISSION_DENIED");
        assert!(app.store.get(&key).is_some());

        let res = app
            .delete_with_token(&routes::image(image), &moderator.token)
            .await;
        assert_eq!(res.status, 204, "{}", res.text);
        assert!(app.store.get(&key).is_none());
    }
}
