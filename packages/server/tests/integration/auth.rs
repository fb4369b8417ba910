use serde_json::json;

use crate::common::{PASSWORD, TestApp, routes};

mod registration {
    use super::*;

    #[tokio::test]
    async fn new_user_can_register_and_gets_a_welcome_email() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({"email": "  Ana@Lules.Market ", "name": "Ana", "password": PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert!(res.body["id"].is_number());
        assert_eq!(res.body["email"], "ana@lules.market");

        let sent = app.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ana@lules.market");
    }

    #[tokio::test]
    async fn email_is_unique_regardless_of_case() {
        let app = TestApp::spawn().await;
        app.create_user("ana@lules.market").await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({"email": "ANA@lules.market", "name": "Otra", "password": PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "EMAIL_TAKEN");
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({"email": "ana@lules.market", "name": "Ana", "password": "short"}),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn malformed_json_is_a_validation_error() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(routes::REGISTER, &json!({"email": "ana@lules.market"}))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod login {
    use super::*;

    #[tokio::test]
    async fn login_returns_token_and_profile() {
        let app = TestApp::spawn().await;
        app.create_user("ana@lules.market").await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "ana@lules.market", "password": PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.body["token"].is_string());
        assert_eq!(res.body["user"]["email"], "ana@lules.market");
        assert_eq!(res.body["user"]["role"], "user");
        assert_eq!(res.body["user"]["permissions"], json!([]));
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let app = TestApp::spawn().await;
        app.create_user("ana@lules.market").await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "ana@lules.market", "password": "wrongpass"}),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn unknown_email_is_indistinguishable_from_wrong_password() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "nadie@lules.market", "password": PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn admin_token_carries_role_permissions() {
        let app = TestApp::spawn().await;
        let admin = app
            .create_user_with_role("mod@lules.market", "moderator")
            .await;

        let res = app.get_with_token(routes::ME, &admin.token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["role"], "moderator");
        let permissions = res.body["permissions"].as_array().unwrap();
        assert!(permissions.contains(&json!("BAN_USERS")));
        assert!(!permissions.contains(&json!("MANAGE_PAYMENTS")));
    }
}

mod me {
    use super::*;

    #[tokio::test]
    async fn requires_a_token() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::ME).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn rejects_a_garbage_token() {
        let app = TestApp::spawn().await;

        let res = app.get_with_token(routes::ME, "not-a-jwt").await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn returns_the_current_user() {
        let app = TestApp::spawn().await;
        let ana = app.create_user("ana@lules.market").await;

        let res = app.get_with_token(routes::ME, &ana.token).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["id"], ana.id);
        assert_eq!(res.body["email"], "ana@lules.market");
    }
}
