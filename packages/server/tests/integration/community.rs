use serde_json::json;

use crate::common::{TestApp, routes};

mod posts {
    use super::*;

    #[tokio::test]
    async fn create_list_and_answer() {
        let app = TestApp::spawn().await;
        let ana = app.create_user("ana@lules.market").await;
        let luis = app.create_user("luis@lules.market").await;

        let created = app
            .post_with_token(
                routes::POSTS,
                &json!({"title": "¿Dónde compro miel?", "content": "Busco miel de la zona"}),
                &ana.token,
            )
            .await;
        assert_eq!(created.status, 201, "{}", created.text);
        assert_eq!(created.body["author_id"], ana.id);
        let post_id = created.id();

        for content in ["En la feria del sábado", "Doña Rosa tiene"] {
            let answer = app
                .post_with_token(
                    &routes::answers(post_id),
                    &json!({"content": content}),
                    &luis.token,
                )
                .await;
            assert_eq!(answer.status, 201, "{}", answer.text);
            assert_eq!(answer.body["post_id"], post_id);
        }

        let detail = app.get_without_token(&routes::post(post_id)).await;
        assert_eq!(detail.status, 200);
        assert_eq!(detail.body["post"]["title"], "¿Dónde compro miel?");
        let answers = detail.body["answers"].as_array().unwrap();
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[0]["content"], "En la feria del sábado");

        let list = app
            .get_without_token(&format!("{}?search=miel", routes::POSTS))
            .await;
        assert_eq!(list.body["pagination"]["total"], 1);
        let none = app
            .get_without_token(&format!("{}?search=pan", routes::POSTS))
            .await;
        assert_eq!(none.body["pagination"]["total"], 0);
    }

    #[tokio::test]
    async fn blank_title_is_rejected() {
        let app = TestApp::spawn().await;
        let ana = app.create_user("ana@lules.market").await;

        let res = app
            .post_with_token(
                routes::POSTS,
                &json!({"title": "   ", "content": "Hola"}),
                &ana.token,
            )
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn posting_requires_a_token() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(routes::POSTS, &json!({"title": "Hola", "content": "Hola"}))
            .await;

        assert_eq!(res.status, 401);
    }

    #[tokio::test]
    async fn unknown_post_is_not_found() {
        let app = TestApp::spawn().await;
        let ana = app.create_user("ana@lules.market").await;

        assert_eq!(app.get_without_token(&routes::post(4242)).await.status, 404);
        let answer = app
            .post_with_token(&routes::answers(4242), &json!({"content": "Hola"}), &ana.token)
            .await;
        assert_eq!(answer.status, 404);
    }
}

mod reviews {
    use super::*;

    #[tokio::test]
    async fn business_reviews_are_averaged() {
        let app = TestApp::spawn().await;
        let category = app.create_category("Panadería").await;
        let owner = app.create_user("rosa@lules.market").await;
        let business_id = app.create_business(&owner, "Doña Rosa", category).await["id"]
            .as_i64()
            .unwrap() as i32;

        for (email, rating) in [
            ("ana@lules.market", 5),
            ("luis@lules.market", 4),
            ("eva@lules.market", 4),
        ] {
            let reviewer = app.create_user(email).await;
            let res = app
                .post_with_token(
                    routes::REVIEWS,
                    &json!({"rating": rating, "comment": "Muy rico", "business_id": business_id}),
                    &reviewer.token,
                )
                .await;
            assert_eq!(res.status, 201, "{}", res.text);
        }

        let list = app
            .get_without_token(&format!("{}?business_id={business_id}", routes::REVIEWS))
            .await;

        assert_eq!(list.status, 200, "{}", list.text);
        assert_eq!(list.body["pagination"]["total"], 3);
        assert_eq!(list.body["average_rating"], 4.3);
    }

    #[tokio::test]
    async fn product_review_is_listed_under_the_product() {
        let app = TestApp::spawn().await;
        let category = app.create_category("Panadería").await;
        let owner = app.create_user("rosa@lules.market").await;
        app.create_business(&owner, "Doña Rosa", category).await;
        let product_id = app.create_product(&owner, "Facturas", category, false).await;
        let ana = app.create_user("ana@lules.market").await;

        let res = app
            .post_with_token(
                routes::REVIEWS,
                &json!({"rating": 3, "product_id": product_id}),
                &ana.token,
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["product_id"], product_id);
        assert!(res.body["business_id"].is_null());

        let list = app
            .get_without_token(&format!("{}?product_id={product_id}", routes::REVIEWS))
            .await;
        assert_eq!(list.body["data"][0]["author_id"], ana.id);
        assert_eq!(list.body["average_rating"], 3.0);
    }

    #[tokio::test]
    async fn empty_list_has_no_average() {
        let app = TestApp::spawn().await;
        let category = app.create_category("Panadería").await;
        let owner = app.create_user("rosa@lules.market").await;
        let business_id = app.create_business(&owner, "Doña Rosa", category).await["id"]
            .as_i64()
            .unwrap() as i32;

        let list = app
            .get_without_token(&format!("{}?business_id={business_id}", routes::REVIEWS))
            .await;

        assert_eq!(list.status, 200);
        assert!(list.body["average_rating"].is_null());
    }

    #[tokio::test]
    async fn owners_cannot_review_themselves() {
        let app = TestApp::spawn().await;
        let category = app.create_category("Panadería").await;
        let owner = app.create_user("rosa@lules.market").await;
        let business_id = app.create_business(&owner, "Doña Rosa", category).await["id"]
            .as_i64()
            .unwrap() as i32;
        let product_id = app.create_product(&owner, "Facturas", category, false).await;

        let on_business = app
            .post_with_token(
                routes::REVIEWS,
                &json!({"rating": 5, "business_id": business_id}),
                &owner.token,
            )
            .await;
        assert_eq!(on_business.status, 400);

        let on_product = app
            .post_with_token(
                routes::REVIEWS,
                &json!({"rating": 5, "product_id": product_id}),
                &owner.token,
            )
            .await;
        assert_eq!(on_product.status, 400);
    }

    #[tokio::test]
    async fn second_review_of_the_same_target_conflicts() {
        let app = TestApp::spawn().await;
        let category = app.create_category("Panadería").await;
        let owner = app.create_user("rosa@lules.market").await;
        let business_id = app.create_business(&owner, "Doña Rosa", category).await["id"]
            .as_i64()
            .unwrap() as i32;
        let ana = app.create_user("ana@lules.market").await;
        let body = json!({"rating": 4, "business_id": business_id});

        let first = app.post_with_token(routes::REVIEWS, &body, &ana.token).await;
        assert_eq!(first.status, 201);
        let second = app.post_with_token(routes::REVIEWS, &body, &ana.token).await;
        assert_eq!(second.status, 409);
    }

    #[tokio::test]
    async fn target_must_be_exactly_one() {
        let app = TestApp::spawn().await;
        let ana = app.create_user("ana@lules.market").await;

        let both = app
            .post_with_token(
                routes::REVIEWS,
                &json!({"rating": 4, "business_id": 1, "product_id": 1}),
                &ana.token,
            )
            .await;
        assert_eq!(both.status, 400);

        let neither = app.get_without_token(routes::REVIEWS).await;
        assert_eq!(neither.status, 400);
    }

    #[tokio::test]
    async fn rating_outside_range_is_rejected() {
        let app = TestApp::spawn().await;
        let ana = app.create_user("ana@lules.market").await;

        let res = app
            .post_with_token(
                routes::REVIEWS,
                &json!({"rating": 6, "business_id": 1}),
                &ana.token,
            )
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn missing_business_is_not_found() {
        let app = TestApp::spawn().await;
        let ana = app.create_user("ana@lules.market").await;

        let res = app
            .post_with_token(
                routes::REVIEWS,
                &json!({"rating": 4, "business_id": 9_999}),
                &ana.token,
            )
            .await;

        assert_eq!(res.status, 404);
    }
}
