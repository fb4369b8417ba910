//! Email bodies. All user-supplied text is HTML-escaped.

use chrono::{DateTime, Utc};
use lules_common::PlanTier;

use super::EmailMessage;

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!doctype html><html><body style=\"font-family:sans-serif\">\
         <h2>{title}</h2>{body}\
         <p style=\"color:#888\">Lules Market</p></body></html>"
    )
}

fn format_date(at: DateTime<Utc>) -> String {
    at.format("%d/%m/%Y").to_string()
}

pub fn welcome(to: &str, name: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "¡Bienvenido a Lules Market!".into(),
        html: layout(
            "¡Bienvenido!",
            &format!(
                "<p>Hola {}, tu cuenta fue creada correctamente.</p>",
                escape_html(name)
            ),
        ),
    }
}

pub fn plan_expired(to: &str, business_name: &str, tier: PlanTier) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Tu plan ha expirado".into(),
        html: layout(
            "Tu plan ha expirado",
            &format!(
                "<p>El plan {tier} de <strong>{}</strong> ha expirado. \
                 Tu negocio volvió al plan FREE; renueva tu suscripción para recuperar \
                 los beneficios.</p>",
                escape_html(business_name)
            ),
        ),
    }
}

pub fn payment_approved(
    to: &str,
    business_name: &str,
    tier: PlanTier,
    expires_at: DateTime<Utc>,
) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Pago aprobado".into(),
        html: layout(
            "Pago aprobado",
            &format!(
                "<p>Activamos el plan {tier} para <strong>{}</strong>. \
                 Vigente hasta el {}.</p>",
                escape_html(business_name),
                format_date(expires_at)
            ),
        ),
    }
}

pub fn payment_rejected(to: &str, business_name: &str, tier: PlanTier) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Pago rechazado".into(),
        html: layout(
            "Pago rechazado",
            &format!(
                "<p>No pudimos aprobar el pago del plan {tier} para <strong>{}</strong>.</p>",
                escape_html(business_name)
            ),
        ),
    }
}

pub fn trial_granted(
    to: &str,
    business_name: &str,
    tier: PlanTier,
    expires_at: DateTime<Utc>,
) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "¡Tienes un período de prueba!".into(),
        html: layout(
            "Período de prueba activado",
            &format!(
                "<p><strong>{}</strong> tiene el plan {tier} de prueba hasta el {}.</p>",
                escape_html(business_name),
                format_date(expires_at)
            ),
        ),
    }
}

pub fn business_banned(to: &str, business_name: &str, reason: Option<&str>) -> EmailMessage {
    let reason = reason
        .map(|r| format!("<p>Motivo: {}</p>", escape_html(r)))
        .unwrap_or_default();
    EmailMessage {
        to: to.to_string(),
        subject: "Tu negocio fue suspendido".into(),
        html: layout(
            "Negocio suspendido",
            &format!(
                "<p><strong>{}</strong> fue suspendido por un administrador.</p>{reason}",
                escape_html(business_name)
            ),
        ),
    }
}

pub fn account_banned(to: &str, name: &str, reason: Option<&str>) -> EmailMessage {
    let reason = reason
        .map(|r| format!("<p>Motivo: {}</p>", escape_html(r)))
        .unwrap_or_default();
    EmailMessage {
        to: to.to_string(),
        subject: "Tu cuenta fue suspendida".into(),
        html: layout(
            "Cuenta suspendida",
            &format!(
                "<p>Hola {}, tu cuenta fue suspendida por un administrador.</p>{reason}",
                escape_html(name)
            ),
        ),
    }
}
