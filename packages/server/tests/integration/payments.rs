use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use crate::common::{TestApp, TestUser, routes};

async fn owner_with_business(app: &TestApp) -> (TestUser, i32) {
    let category = app.create_category("Panadería").await;
    let owner = app.create_user("rosa@lules.market").await;
    let created = app.create_business(&owner, "Doña Rosa", category).await;
    (owner, created["id"].as_i64().unwrap() as i32)
}

fn parse_time(value: &serde_json::Value) -> DateTime<Utc> {
    value
        .as_str()
        .expect("timestamp string")
        .parse()
        .expect("RFC 3339 timestamp")
}

mod checkout {
    use super::*;

    #[tokio::test]
    async fn creates_a_pending_payment_at_plan_price() {
        let app = TestApp::spawn().await;
        let (owner, business_id) = owner_with_business(&app).await;

        let res = app
            .post_with_token(routes::CHECKOUT, &json!({"tier": "BASIC"}), &owner.token)
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["status"], "pending");
        assert_eq!(res.body["business_id"], business_id);
        assert_eq!(res.body["amount_cents"], 9_900);

        let mine = app.get_with_token(routes::MY_PAYMENTS, &owner.token).await;
        assert_eq!(mine.body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn free_tier_needs_no_payment() {
        let app = TestApp::spawn().await;
        let (owner, _) = owner_with_business(&app).await;

        let res = app
            .post_with_token(routes::CHECKOUT, &json!({"tier": "FREE"}), &owner.token)
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn second_pending_checkout_for_the_same_tier_conflicts() {
        let app = TestApp::spawn().await;
        let (owner, _) = owner_with_business(&app).await;
        let body = json!({"tier": "PREMIUM"});

        let first = app.post_with_token(routes::CHECKOUT, &body, &owner.token).await;
        assert_eq!(first.status, 201);
        let second = app.post_with_token(routes::CHECKOUT, &body, &owner.token).await;

        assert_eq!(second.status, 409);
    }

    #[tokio::test]
    async fn caller_without_business_gets_not_found() {
        let app = TestApp::spawn().await;
        let user = app.create_user("ana@lules.market").await;

        let res = app
            .post_with_token(routes::CHECKOUT, &json!({"tier": "BASIC"}), &user.token)
            .await;

        assert_eq!(res.status, 404);
    }
}

mod review {
    use super::*;

    #[tokio::test]
    async fn approval_activates_the_plan_for_thirty_days() {
        let app = TestApp::spawn().await;
        let (owner, _) = owner_with_business(&app).await;
        let admin = app
            .create_user_with_role("billing@lules.market", "billing")
            .await;

        let payment = app
            .post_with_token(routes::CHECKOUT, &json!({"tier": "PREMIUM"}), &owner.token)
            .await
            .id();
        let res = app
            .post_with_token(&routes::approve_payment(payment), &json!({}), &admin.token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "approved");
        assert_eq!(res.body["reviewed_by_id"], admin.id);

        let mine = app.get_with_token(routes::MY_BUSINESS, &owner.token).await;
        assert_eq!(mine.body["plan"]["tier"], "PREMIUM");
        let expires_at = parse_time(&mine.body["usage"]["expires_at"]);
        let expected = Utc::now() + Duration::days(30);
        assert!((expires_at - expected).num_minutes().abs() < 5);

        assert!(
            app.mailer
                .sent()
                .iter()
                .any(|m| m.to == owner.email && m.subject == "Pago aprobado")
        );
    }

    #[tokio::test]
    async fn a_processed_payment_cannot_be_reviewed_again() {
        let app = TestApp::spawn().await;
        let (owner, _) = owner_with_business(&app).await;
        let admin = app
            .create_user_with_role("billing@lules.market", "billing")
            .await;
        let payment = app.buy_plan(&owner, &admin, "BASIC").await;

        let approve = app
            .post_with_token(&routes::approve_payment(payment), &json!({}), &admin.token)
            .await;
        let reject = app
            .post_with_token(&routes::reject_payment(payment), &json!({}), &admin.token)
            .await;

        assert_eq!(approve.status, 409);
        assert_eq!(reject.status, 409);
    }

    #[tokio::test]
    async fn rejection_leaves_the_plan_unchanged() {
        let app = TestApp::spawn().await;
        let (owner, _) = owner_with_business(&app).await;
        let admin = app
            .create_user_with_role("billing@lules.market", "billing")
            .await;
        let payment = app
            .post_with_token(routes::CHECKOUT, &json!({"tier": "BASIC"}), &owner.token)
            .await
            .id();

        let res = app
            .post_with_token(&routes::reject_payment(payment), &json!({}), &admin.token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "rejected");
        let mine = app.get_with_token(routes::MY_BUSINESS, &owner.token).await;
        assert_eq!(mine.body["plan"]["tier"], "FREE");
    }

    #[tokio::test]
    async fn only_payment_managers_may_review() {
        let app = TestApp::spawn().await;
        let (owner, _) = owner_with_business(&app).await;
        let moderator = app
            .create_user_with_role("mod@lules.market", "moderator")
            .await;
        let payment = app
            .post_with_token(routes::CHECKOUT, &json!({"tier": "BASIC"}), &owner.token)
            .await
            .id();

        let res = app
            .post_with_token(&routes::approve_payment(payment), &json!({}), &moderator.token)
            .await;

        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn payment_list_filters_by_status() {
        let app = TestApp::spawn().await;
        let (owner, _) = owner_with_business(&app).await;
        let admin = app
            .create_user_with_role("billing@lules.market", "billing")
            .await;
        app.buy_plan(&owner, &admin, "BASIC").await;
        app.post_with_token(routes::CHECKOUT, &json!({"tier": "PREMIUM"}), &owner.token)
            .await;

        let pending = app
            .get_with_token(&format!("{}?status=pending", routes::ADMIN_PAYMENTS), &admin.token)
            .await;
        let all = app.get_with_token(routes::ADMIN_PAYMENTS, &admin.token).await;
        let bogus = app
            .get_with_token(&format!("{}?status=paid", routes::ADMIN_PAYMENTS), &admin.token)
            .await;

        assert_eq!(pending.status, 200, "{}", pending.text);
        assert_eq!(pending.body["pagination"]["total"], 1);
        assert_eq!(pending.body["data"][0]["tier"], "PREMIUM");
        assert_eq!(all.body["pagination"]["total"], 2);
        assert_eq!(bogus.status, 400);
    }
}

mod trials {
    use super::*;

    #[tokio::test]
    async fn trial_upgrades_the_business_until_expiry() {
        let app = TestApp::spawn().await;
        let (owner, business_id) = owner_with_business(&app).await;
        let admin = app
            .create_user_with_role("billing@lules.market", "billing")
            .await;

        let res = app
            .post_with_token(
                &routes::grant_trial(business_id),
                &json!({"tier": "BASIC", "days": 14}),
                &admin.token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["tier"], "BASIC");
        assert_eq!(res.body["is_active"], true);

        let mine = app.get_with_token(routes::MY_BUSINESS, &owner.token).await;
        assert_eq!(mine.body["plan"]["tier"], "BASIC");
        assert_eq!(mine.body["usage"]["is_trial"], true);
    }

    #[tokio::test]
    async fn a_business_gets_only_one_trial() {
        let app = TestApp::spawn().await;
        let (_, business_id) = owner_with_business(&app).await;
        let admin = app
            .create_user_with_role("billing@lules.market", "billing")
            .await;
        let body = json!({"tier": "BASIC", "days": 7});

        let first = app
            .post_with_token(&routes::grant_trial(business_id), &body, &admin.token)
            .await;
        assert_eq!(first.status, 201);
        let second = app
            .post_with_token(&routes::grant_trial(business_id), &body, &admin.token)
            .await;

        assert_eq!(second.status, 409);
    }

    #[tokio::test]
    async fn no_trial_on_top_of_a_paid_plan() {
        let app = TestApp::spawn().await;
        let (owner, business_id) = owner_with_business(&app).await;
        let admin = app
            .create_user_with_role("billing@lules.market", "billing")
            .await;
        app.buy_plan(&owner, &admin, "BASIC").await;

        let res = app
            .post_with_token(
                &routes::grant_trial(business_id),
                &json!({"tier": "PREMIUM", "days": 7}),
                &admin.token,
            )
            .await;

        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn trial_length_and_tier_are_validated() {
        let app = TestApp::spawn().await;
        let (_, business_id) = owner_with_business(&app).await;
        let admin = app
            .create_user_with_role("billing@lules.market", "billing")
            .await;

        let too_long = app
            .post_with_token(
                &routes::grant_trial(business_id),
                &json!({"tier": "BASIC", "days": 91}),
                &admin.token,
            )
            .await;
        let free = app
            .post_with_token(
                &routes::grant_trial(business_id),
                &json!({"tier": "FREE", "days": 7}),
                &admin.token,
            )
            .await;

        assert_eq!(too_long.status, 400);
        assert_eq!(free.status, 400);
    }
}
