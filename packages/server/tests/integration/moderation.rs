use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;

use lules_server::entity::{audit_log, banned_business, banned_user, business, user};

use crate::common::{PASSWORD, TestApp, routes};

/// Make every `UPDATE` on `table` fail, so the flag flip inside a ban or
/// unban transaction errors after the ban record was already written.
async fn block_updates_on(app: &TestApp, table: &str) {
    app.exec_sql(
        "CREATE OR REPLACE FUNCTION reject_update() RETURNS trigger AS $$ \
         BEGIN RAISE EXCEPTION 'updates disabled'; END; \
         $$ LANGUAGE plpgsql",
    )
    .await;
    app.exec_sql(&format!(
        "CREATE TRIGGER block_update BEFORE UPDATE ON {table} \
         FOR EACH ROW EXECUTE FUNCTION reject_update()"
    ))
    .await;
}

mod users {
    use super::*;

    #[tokio::test]
    async fn banned_user_cannot_log_in_or_write() {
        let app = TestApp::spawn().await;
        let moderator = app
            .create_user_with_role("mod@lules.market", "moderator")
            .await;
        let target = app.create_user("spam@lules.market").await;

        let res = app
            .post_with_token(
                &routes::ban_user(target.id),
                &json!({"reason": "Spam"}),
                &moderator.token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["is_banned"], true);

        let login = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "spam@lules.market", "password": PASSWORD}),
            )
            .await;
        assert_eq!(login.status, 403);
        assert_eq!(login.body["code"], "ACCOUNT_BANNED");

        // The old token is still signed but write paths re-check the flag.
        let post = app
            .post_with_token(
                routes::POSTS,
                &json!({"title": "Hola", "content": "Compren"}),
                &target.token,
            )
            .await;
        assert_eq!(post.status, 403);
        assert_eq!(post.body["code"], "ACCOUNT_BANNED");

        assert!(
            app.mailer
                .sent()
                .iter()
                .any(|m| m.to == "spam@lules.market" && m.html.contains("Spam"))
        );
    }

    #[tokio::test]
    async fn unban_restores_access() {
        let app = TestApp::spawn().await;
        let moderator = app
            .create_user_with_role("mod@lules.market", "moderator")
            .await;
        let target = app.create_user("ana@lules.market").await;
        app.post_with_token(&routes::ban_user(target.id), &json!({}), &moderator.token)
            .await;

        let res = app
            .delete_with_token(&routes::ban_user(target.id), &moderator.token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["is_banned"], false);
        app.login("ana@lules.market").await;
    }

    #[tokio::test]
    async fn admins_cannot_ban_themselves() {
        let app = TestApp::spawn().await;
        let moderator = app
            .create_user_with_role("mod@lules.market", "moderator")
            .await;

        let res = app
            .post_with_token(&routes::ban_user(moderator.id), &json!({}), &moderator.token)
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn banning_twice_conflicts_and_unbanning_a_clean_user_conflicts() {
        let app = TestApp::spawn().await;
        let moderator = app
            .create_user_with_role("mod@lules.market", "moderator")
            .await;
        let target = app.create_user("ana@lules.market").await;

        let clean_unban = app
            .delete_with_token(&routes::ban_user(target.id), &moderator.token)
            .await;
        assert_eq!(clean_unban.status, 409);

        let first = app
            .post_with_token(&routes::ban_user(target.id), &json!({}), &moderator.token)
            .await;
        assert_eq!(first.status, 200);
        let second = app
            .post_with_token(&routes::ban_user(target.id), &json!({}), &moderator.token)
            .await;
        assert_eq!(second.status, 409);
    }

    #[tokio::test]
    async fn regular_users_cannot_ban() {
        let app = TestApp::spawn().await;
        let user = app.create_user("ana@lules.market").await;
        let target = app.create_user("otro@lules.market").await;

        let res = app
            .post_with_token(&routes::ban_user(target.id), &json!({}), &user.token)
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let app = TestApp::spawn().await;
        let moderator = app
            .create_user_with_role("mod@lules.market", "moderator")
            .await;

        let res = app
            .post_with_token(&routes::ban_user(99_999), &json!({}), &moderator.token)
            .await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn failed_flag_update_keeps_the_ban_record_on_unban() {
        let app = TestApp::spawn().await;
        let moderator = app
            .create_user_with_role("mod@lules.market", "moderator")
            .await;
        let target = app.create_user("spam@lules.market").await;
        let ban = app
            .post_with_token(&routes::ban_user(target.id), &json!({}), &moderator.token)
            .await;
        assert_eq!(ban.status, 200, "{}", ban.text);
        block_updates_on(&app, "\"user\"").await;

        let res = app
            .delete_with_token(&routes::ban_user(target.id), &moderator.token)
            .await;
        assert_eq!(res.status, 500);

        let records = banned_user::Entity::find()
            .filter(banned_user::Column::UserId.eq(target.id))
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(records, 1);
        let stored = user::Entity::find_by_id(target.id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.is_banned);
    }

    #[tokio::test]
    async fn banned_users_are_listed() {
        let app = TestApp::spawn().await;
        let moderator = app
            .create_user_with_role("mod@lules.market", "moderator")
            .await;
        let target = app.create_user("spam@lules.market").await;
        app.post_with_token(
            &routes::ban_user(target.id),
            &json!({"reason": "Spam"}),
            &moderator.token,
        )
        .await;

        let res = app
            .get_with_token(routes::ADMIN_BANNED_USERS, &moderator.token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["email"], "spam@lules.market");
        assert_eq!(res.body["data"][0]["reason"], "Spam");
        assert_eq!(res.body["data"][0]["banned_by_id"], moderator.id);
    }
}

mod businesses {
    use super::*;

    #[tokio::test]
    async fn banned_business_is_hidden_and_audited() {
        let app = TestApp::spawn().await;
        let category = app.create_category("Panadería").await;
        let moderator = app
            .create_user_with_role("mod@lules.market", "moderator")
            .await;
        let owner = app.create_user("rosa@lules.market").await;
        let created = app.create_business(&owner, "Doña Rosa", category).await;
        let id = created["id"].as_i64().unwrap() as i32;
        app.create_product(&owner, "Facturas", category, false).await;

        // Warm the caches the ban must invalidate.
        assert_eq!(app.get_without_token(&routes::business("dona-rosa")).await.status, 200);
        let before = app.get_without_token(routes::RECENT_PRODUCTS).await;
        assert_eq!(before.body.as_array().unwrap().len(), 1);

        let res = app
            .post_with_token(
                &routes::ban_business(id),
                &json!({"reason": "Productos falsificados"}),
                &moderator.token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["target_id"], id);

        assert_eq!(app.get_without_token(&routes::business("dona-rosa")).await.status, 404);
        let after = app.get_without_token(routes::RECENT_PRODUCTS).await;
        assert_eq!(after.body.as_array().unwrap().len(), 0);

        let audits = audit_log::Entity::find()
            .filter(audit_log::Column::Action.eq("business_banned"))
            .filter(audit_log::Column::EntityId.eq(id))
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(audits, 1);

        let listed = app
            .get_with_token(routes::ADMIN_BANNED_BUSINESSES, &moderator.token)
            .await;
        assert_eq!(listed.body["data"][0]["slug"], "dona-rosa");
    }

    #[tokio::test]
    async fn second_ban_conflicts_and_writes_nothing() {
        let app = TestApp::spawn().await;
        let category = app.create_category("Panadería").await;
        let admin = app
            .create_user_with_role("root@lules.market", "super_admin")
            .await;
        let owner = app.create_user("rosa@lules.market").await;
        let id = app.create_business(&owner, "Doña Rosa", category).await["id"]
            .as_i64()
            .unwrap() as i32;

        let first = app
            .post_with_token(&routes::ban_business(id), &json!({}), &admin.token)
            .await;
        assert_eq!(first.status, 200, "{}", first.text);
        let second = app
            .post_with_token(
                &routes::ban_business(id),
                &json!({"reason": "otra vez"}),
                &admin.token,
            )
            .await;
        assert_eq!(second.status, 409);
        assert!(second.body["message"].as_str().unwrap().contains("ya está baneado"));

        let records = banned_business::Entity::find()
            .filter(banned_business::Column::BusinessId.eq(id))
            .all(&app.db)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].banned_by_id, admin.id);
        assert!(records[0].reason.is_none());
    }

    #[tokio::test]
    async fn admin_without_ban_permission_writes_nothing() {
        let app = TestApp::spawn().await;
        let category = app.create_category("Panadería").await;
        let billing = app
            .create_user_with_role("billing@lules.market", "billing")
            .await;
        let owner = app.create_user("rosa@lules.market").await;
        let id = app.create_business(&owner, "Doña Rosa", category).await["id"]
            .as_i64()
            .unwrap() as i32;

        let res = app
            .post_with_token(&routes::ban_business(id), &json!({}), &billing.token)
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
        let records = banned_business::Entity::find()
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(records, 0);
        let stored = business::Entity::find_by_id(id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.is_banned);
    }

    #[tokio::test]
    async fn owner_cannot_edit_a_banned_business() {
        let app = TestApp::spawn().await;
        let category = app.create_category("Panadería").await;
        let moderator = app
            .create_user_with_role("mod@lules.market", "moderator")
            .await;
        let owner = app.create_user("rosa@lules.market").await;
        let id = app.create_business(&owner, "Doña Rosa", category).await["id"]
            .as_i64()
            .unwrap() as i32;
        app.post_with_token(&routes::ban_business(id), &json!({}), &moderator.token)
            .await;

        let res = app
            .patch_with_token(&routes::business(id), &json!({"name": "Nueva"}), &owner.token)
            .await;

        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn unban_makes_the_storefront_visible_again() {
        let app = TestApp::spawn().await;
        let category = app.create_category("Panadería").await;
        let moderator = app
            .create_user_with_role("mod@lules.market", "moderator")
            .await;
        let owner = app.create_user("rosa@lules.market").await;
        let id = app.create_business(&owner, "Doña Rosa", category).await["id"]
            .as_i64()
            .unwrap() as i32;
        app.post_with_token(&routes::ban_business(id), &json!({}), &moderator.token)
            .await;

        let res = app
            .delete_with_token(&routes::ban_business(id), &moderator.token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(app.get_without_token(&routes::business("dona-rosa")).await.status, 200);
        let records = banned_business::Entity::find()
            .filter(banned_business::Column::BusinessId.eq(id))
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(records, 0);
    }

    #[tokio::test]
    async fn admin_cannot_ban_their_own_business() {
        let app = TestApp::spawn().await;
        let category = app.create_category("Panadería").await;
        let moderator = app
            .create_user_with_role("mod@lules.market", "moderator")
            .await;
        let id = app.create_business(&moderator, "Mi Negocio", category).await["id"]
            .as_i64()
            .unwrap() as i32;

        let res = app
            .post_with_token(&routes::ban_business(id), &json!({}), &moderator.token)
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn failed_flag_update_rolls_back_the_ban_record() {
        let app = TestApp::spawn().await;
        let category = app.create_category("Panadería").await;
        let moderator = app
            .create_user_with_role("mod@lules.market", "moderator")
            .await;
        let owner = app.create_user("rosa@lules.market").await;
        let id = app.create_business(&owner, "Doña Rosa", category).await["id"]
            .as_i64()
            .unwrap() as i32;

        block_updates_on(&app, "business").await;

        let res = app
            .post_with_token(&routes::ban_business(id), &json!({}), &moderator.token)
            .await;
        assert_eq!(res.status, 500);
        assert_eq!(res.body["code"], "INTERNAL_ERROR");

        let records = banned_business::Entity::find()
            .filter(banned_business::Column::BusinessId.eq(id))
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(records, 0);
        let stored = business::Entity::find_by_id(id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.is_banned);
    }

    #[tokio::test]
    async fn failed_flag_update_keeps_the_ban_record_on_unban() {
        let app = TestApp::spawn().await;
        let category = app.create_category("Panadería").await;
        let moderator = app
            .create_user_with_role("mod@lules.market", "moderator")
            .await;
        let owner = app.create_user("rosa@lules.market").await;
        let id = app.create_business(&owner, "Doña Rosa", category).await["id"]
            .as_i64()
            .unwrap() as i32;
        let ban = app
            .post_with_token(&routes::ban_business(id), &json!({}), &moderator.token)
            .await;
        assert_eq!(ban.status, 200, "{}", ban.text);
        block_updates_on(&app, "business").await;

        let res = app
            .delete_with_token(&routes::ban_business(id), &moderator.token)
            .await;
        assert_eq!(res.status, 500);
        assert_eq!(res.body["code"], "INTERNAL_ERROR");

        let records = banned_business::Entity::find()
            .filter(banned_business::Column::BusinessId.eq(id))
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(records, 1);
        let stored = business::Entity::find_by_id(id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.is_banned);
    }
}

mod dashboard {
    use super::*;

    #[tokio::test]
    async fn totals_and_trends_cover_approved_revenue() {
        let app = TestApp::spawn().await;
        let category = app.create_category("Panadería").await;
        let admin = app
            .create_user_with_role("root@lules.market", "super_admin")
            .await;
        let owner = app.create_user("rosa@lules.market").await;
        app.create_business(&owner, "Doña Rosa", category).await;
        app.create_product(&owner, "Facturas", category, false).await;
        app.buy_plan(&owner, &admin, "BASIC").await;

        let res = app.get_with_token(routes::ADMIN_DASHBOARD, &admin.token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["totals"]["users"], 2);
        assert_eq!(res.body["totals"]["businesses"], 1);
        assert_eq!(res.body["totals"]["products"], 1);
        assert_eq!(res.body["totals"]["revenue_cents"], 9_900);
        assert_eq!(res.body["trends"]["revenue"]["current"], 9_900);
        assert_eq!(res.body["trends"]["users"]["current"], 2);
        assert_eq!(res.body["trends"]["users"]["previous"], 0);
        assert_eq!(res.body["trends"]["users"]["percentage"], 100.0);
    }

    #[tokio::test]
    async fn requires_dashboard_permission() {
        let app = TestApp::spawn().await;
        let user = app.create_user("ana@lules.market").await;

        let res = app.get_with_token(routes::ADMIN_DASHBOARD, &user.token).await;

        assert_eq!(res.status, 403);
    }
}
