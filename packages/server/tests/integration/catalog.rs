use serde_json::json;

use crate::common::{TestApp, routes};

mod categories {
    use super::*;

    #[tokio::test]
    async fn only_category_managers_can_create_categories() {
        let app = TestApp::spawn().await;
        let user = app.create_user("ana@lules.market").await;

        let res = app
            .post_with_token(routes::CATEGORIES, &json!({"name": "Panadería"}), &user.token)
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn created_category_shows_up_in_the_cached_list() {
        let app = TestApp::spawn().await;
        let admin = app
            .create_user_with_role("root@lules.market", "super_admin")
            .await;

        let before = app.get_without_token(routes::CATEGORIES).await;
        assert_eq!(before.status, 200);
        assert_eq!(before.body.as_array().unwrap().len(), 0);

        let res = app
            .post_with_token(
                routes::CATEGORIES,
                &json!({"name": "Panadería Artesanal"}),
                &admin.token,
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["slug"], "panaderia-artesanal");

        let after = app.get_without_token(routes::CATEGORIES).await;
        assert_eq!(after.body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_category_conflicts() {
        let app = TestApp::spawn().await;
        let admin = app
            .create_user_with_role("root@lules.market", "super_admin")
            .await;
        let body = json!({"name": "Verdulería"});

        let first = app
            .post_with_token(routes::CATEGORIES, &body, &admin.token)
            .await;
        assert_eq!(first.status, 201);
        let second = app
            .post_with_token(routes::CATEGORIES, &body, &admin.token)
            .await;

        assert_eq!(second.status, 409);
    }
}

mod businesses {
    use super::*;

    #[tokio::test]
    async fn new_business_starts_on_the_free_plan() {
        let app = TestApp::spawn().await;
        let category = app.create_category("Panadería").await;
        let owner = app.create_user("rosa@lules.market").await;

        let created = app
            .create_business(&owner, "Panadería Doña Rosa", category)
            .await;
        assert_eq!(created["slug"], "panaderia-dona-rosa");

        let mine = app.get_with_token(routes::MY_BUSINESS, &owner.token).await;
        assert_eq!(mine.status, 200, "{}", mine.text);
        assert_eq!(mine.body["plan"]["tier"], "FREE");
        assert_eq!(mine.body["usage"]["products_used"], 0);
        assert_eq!(mine.body["usage"]["is_trial"], false);
    }

    #[tokio::test]
    async fn an_owner_has_a_single_business() {
        let app = TestApp::spawn().await;
        let category = app.create_category("Panadería").await;
        let owner = app.create_user("rosa@lules.market").await;
        app.create_business(&owner, "Panadería Doña Rosa", category)
            .await;

        let res = app
            .post_with_token(
                routes::BUSINESSES,
                &json!({"name": "Otra", "description": "", "category_id": category}),
                &owner.token,
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn slugs_are_made_unique() {
        let app = TestApp::spawn().await;
        let category = app.create_category("Panadería").await;
        let a = app.create_user("a@lules.market").await;
        let b = app.create_user("b@lules.market").await;

        let first = app.create_business(&a, "La Esquina", category).await;
        let second = app.create_business(&b, "La Esquina", category).await;

        assert_eq!(first["slug"], "la-esquina");
        assert_eq!(second["slug"], "la-esquina-2");
    }

    #[tokio::test]
    async fn storefront_lists_visible_products() {
        let app = TestApp::spawn().await;
        let category = app.create_category("Panadería").await;
        let owner = app.create_user("rosa@lules.market").await;
        app.create_business(&owner, "Doña Rosa", category).await;
        app.create_product(&owner, "Facturas", category, false).await;

        let res = app.get_without_token(&routes::business("dona-rosa")).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["tier"], "FREE");
        assert_eq!(res.body["products"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deactivated_business_disappears_from_public_views() {
        let app = TestApp::spawn().await;
        let category = app.create_category("Panadería").await;
        let owner = app.create_user("rosa@lules.market").await;
        let created = app.create_business(&owner, "Doña Rosa", category).await;
        let id = created["id"].as_i64().unwrap();

        // Warm the storefront cache first.
        let warm = app.get_without_token(&routes::business("dona-rosa")).await;
        assert_eq!(warm.status, 200);

        let res = app
            .patch_with_token(
                &routes::business(id),
                &json!({"is_active": false}),
                &owner.token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let storefront = app.get_without_token(&routes::business("dona-rosa")).await;
        assert_eq!(storefront.status, 404);
        let list = app.get_without_token(routes::BUSINESSES).await;
        assert_eq!(list.body["pagination"]["total"], 0);
    }

    #[tokio::test]
    async fn only_the_owner_can_update() {
        let app = TestApp::spawn().await;
        let category = app.create_category("Panadería").await;
        let owner = app.create_user("rosa@lules.market").await;
        let other = app.create_user("otro@lules.market").await;
        let created = app.create_business(&owner, "Doña Rosa", category).await;

        let res = app
            .patch_with_token(
                &routes::business(created["id"].as_i64().unwrap()),
                &json!({"name": "Robada"}),
                &other.token,
            )
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn search_filters_by_name() {
        let app = TestApp::spawn().await;
        let category = app.create_category("Panadería").await;
        let a = app.create_user("a@lules.market").await;
        let b = app.create_user("b@lules.market").await;
        app.create_business(&a, "Panadería Centro", category).await;
        app.create_business(&b, "Ferretería Sur", category).await;

        let res = app
            .get_without_token(&format!("{}?search=PANAD", routes::BUSINESSES))
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["name"], "Panadería Centro");
    }
}

mod products {
    use super::*;

    #[tokio::test]
    async fn free_plan_product_limit_is_enforced() {
        let app = TestApp::spawn().await;
        let category = app.create_category("Panadería").await;
        let owner = app.create_user("rosa@lules.market").await;
        app.create_business(&owner, "Doña Rosa", category).await;

        for i in 0..10 {
            app.create_product(&owner, &format!("Producto {i}"), category, false)
                .await;
        }

        let res = app
            .post_with_token(
                routes::PRODUCTS,
                &json!({"name": "Uno más", "price_cents": 100, "category_id": category}),
                &owner.token,
            )
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PLAN_LIMIT_REACHED");

        let mine = app.get_with_token(routes::MY_BUSINESS, &owner.token).await;
        assert_eq!(mine.body["usage"]["products_used"], 10);
    }

    #[tokio::test]
    async fn featured_products_need_a_paid_plan() {
        let app = TestApp::spawn().await;
        let category = app.create_category("Panadería").await;
        let owner = app.create_user("rosa@lules.market").await;
        app.create_business(&owner, "Doña Rosa", category).await;

        let res = app
            .post_with_token(
                routes::PRODUCTS,
                &json!({"name": "Torta", "price_cents": 100, "category_id": category, "featured": true}),
                &owner.token,
            )
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PLAN_LIMIT_REACHED");
    }

    #[tokio::test]
    async fn negative_price_is_rejected() {
        let app = TestApp::spawn().await;
        let category = app.create_category("Panadería").await;
        let owner = app.create_user("rosa@lules.market").await;
        app.create_business(&owner, "Doña Rosa", category).await;

        let res = app
            .post_with_token(
                routes::PRODUCTS,
                &json!({"name": "Torta", "price_cents": -5, "category_id": category}),
                &owner.token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn recent_products_rank_paid_plans_first() {
        let app = TestApp::spawn().await;
        let category = app.create_category("Panadería").await;
        let admin = app
            .create_user_with_role("billing@lules.market", "billing")
            .await;
        let premium = app.create_user("premium@lules.market").await;
        let free = app.create_user("free@lules.market").await;
        app.create_business(&premium, "Premium Shop", category).await;
        app.create_business(&free, "Free Shop", category).await;
        app.buy_plan(&premium, &admin, "PREMIUM").await;

        app.create_product(&premium, "Viejo premium", category, false)
            .await;
        app.create_product(&free, "Nuevo gratis", category, false)
            .await;

        let res = app.get_without_token(routes::RECENT_PRODUCTS).await;

        assert_eq!(res.status, 200, "{}", res.text);
        let items = res.body.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["name"], "Viejo premium");
        assert_eq!(items[0]["tier"], "PREMIUM");
        assert_eq!(items[1]["tier"], "FREE");
    }

    #[tokio::test]
    async fn other_users_cannot_modify_a_product() {
        let app = TestApp::spawn().await;
        let category = app.create_category("Panadería").await;
        let owner = app.create_user("rosa@lules.market").await;
        let other = app.create_user("otro@lules.market").await;
        app.create_business(&owner, "Doña Rosa", category).await;
        let product = app.create_product(&owner, "Facturas", category, false).await;

        let patch = app
            .patch_with_token(&routes::product(product), &json!({"price_cents": 1}), &other.token)
            .await;
        let delete = app
            .delete_with_token(&routes::product(product), &other.token)
            .await;

        assert_eq!(patch.status, 403);
        assert_eq!(delete.status, 403);
    }

    #[tokio::test]
    async fn deleting_a_product_frees_its_slot() {
        let app = TestApp::spawn().await;
        let category = app.create_category("Panadería").await;
        let owner = app.create_user("rosa@lules.market").await;
        app.create_business(&owner, "Doña Rosa", category).await;
        let product = app.create_product(&owner, "Facturas", category, false).await;

        let res = app
            .delete_with_token(&routes::product(product), &owner.token)
            .await;
        assert_eq!(res.status, 204);

        let gone = app.get_without_token(&routes::product(product)).await;
        assert_eq!(gone.status, 404);
        let mine = app.get_with_token(routes::MY_BUSINESS, &owner.token).await;
        assert_eq!(mine.body["usage"]["products_used"], 0);
    }
}

mod plans {
    use super::*;

    #[tokio::test]
    async fn three_plans_are_seeded() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::PLANS).await;

        assert_eq!(res.status, 200);
        let tiers: Vec<_> = res
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["tier"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(tiers, vec!["FREE", "BASIC", "PREMIUM"]);
    }

    #[tokio::test]
    async fn comparing_free_with_premium_is_an_upgrade() {
        let app = TestApp::spawn().await;
        let category = app.create_category("Panadería").await;
        let owner = app.create_user("rosa@lules.market").await;
        app.create_business(&owner, "Doña Rosa", category).await;

        let res = app
            .get_with_token(&routes::compare_plan("premium"), &owner.token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["current"]["tier"], "FREE");
        assert_eq!(res.body["target"]["tier"], "PREMIUM");
        assert_eq!(res.body["is_upgrade"], true);
    }

    #[tokio::test]
    async fn unknown_tier_is_a_validation_error() {
        let app = TestApp::spawn().await;
        let category = app.create_category("Panadería").await;
        let owner = app.create_user("rosa@lules.market").await;
        app.create_business(&owner, "Doña Rosa", category).await;

        let res = app
            .get_with_token(&routes::compare_plan("GOLD"), &owner.token)
            .await;

        assert_eq!(res.status, 400);
    }
}
