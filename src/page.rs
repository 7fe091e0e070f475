use axum::http::{HeaderMap, HeaderValue, header};
use maud::{DOCTYPE, Markup, html};
use serde::{Deserialize, Serialize};

pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

/// One-shot status line carried across the post/redirect/get hop in a cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    /// `Set-Cookie` value holding this flash.
    pub fn to_cookie(&self) -> Option<HeaderValue> {
        let encoded = serde_urlencoded::to_string(self).ok()?;
        HeaderValue::from_str(&format!(
            "{FLASH_COOKIE}={encoded}; Path=/; HttpOnly; SameSite=Lax"
        ))
        .ok()
    }

    /// Reads the flash cookie from request headers, ignoring anything that
    /// does not decode.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().strip_prefix(FLASH_COOKIE)?.strip_prefix('='))
            .find_map(|encoded| serde_urlencoded::from_str(encoded).ok())
    }
}

/// `Set-Cookie` value that expires the flash once it has been shown.
pub fn clear_flash_cookie() -> HeaderValue {
    HeaderValue::from_static("flash=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
}

pub fn render_form(flash: Option<&Flash>, max_repeat: Option<u32>) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { "Send email" }
                style {
                    "body { font-family: Arial, Helvetica, sans-serif; max-width: 40rem; margin: 2rem auto; }"
                    "label { display: block; margin-top: 1rem; }"
                    "input, textarea { width: 100%; box-sizing: border-box; }"
                    ".flash { padding: 0.75rem; border-radius: 4px; }"
                    ".flash.success { background: #e6f4ea; color: #1e4620; }"
                    ".flash.error { background: #fdecea; color: #611a15; }"
                }
            }
            body {
                h1 { "Send email" }
                @if let Some(flash) = flash {
                    @let class = match flash.kind {
                        FlashKind::Success => "flash success",
                        FlashKind::Error => "flash error",
                    };
                    p class=(class) role="status" { (flash.message) }
                }
                form method="post" action="/" enctype="multipart/form-data" {
                    label for="recipient" { "Recipient" }
                    input id="recipient" name="recipient" type="email" required;
                    label for="subject" { "Subject" }
                    input id="subject" name="subject" type="text" required;
                    label for="body" { "Body" }
                    textarea id="body" name="body" rows="8" required {}
                    label for="attachment" { "Attachment" }
                    input id="attachment" name="attachment" type="file";
                    label for="repeat" { "Repeat" }
                    input id="repeat" name="repeat" type="number" value="1" min="1" max=[max_repeat];
                    p { button type="submit" { "Send" } }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie_pair(flash: &Flash) -> String {
        let set_cookie = flash.to_cookie().unwrap();
        set_cookie
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string()
    }

    #[test]
    fn flash_survives_cookie_round_trip() {
        let flash = Flash::success("Email sent to test@example.com 3 time(s).");

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {}", cookie_pair(&flash))).unwrap(),
        );

        assert_eq!(Flash::from_headers(&headers), Some(flash));
    }

    #[test]
    fn cookie_value_has_no_separators() {
        let pair = cookie_pair(&Flash::error("a; b, \"c\" = d"));
        let value = pair.strip_prefix("flash=").unwrap();

        assert!(!value.contains(';'));
        assert!(!value.contains(','));
        assert!(!value.contains(' '));
        assert!(!value.contains('"'));
    }

    #[test]
    fn garbage_or_missing_cookie_yields_none() {
        let mut headers = HeaderMap::new();
        assert_eq!(Flash::from_headers(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("flash=%%%"));
        assert_eq!(Flash::from_headers(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("flashy=kind%3Dsuccess"));
        assert_eq!(Flash::from_headers(&headers), None);
    }

    #[test]
    fn rendered_flash_is_escaped() {
        let page = render_form(Some(&Flash::error("<script>alert(1)</script>")), None).into_string();

        assert!(page.contains("flash error"));
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("<script>"));
    }

    #[test]
    fn form_posts_multipart_with_all_fields() {
        let page = render_form(None, None).into_string();

        assert!(page.contains(r#"enctype="multipart/form-data""#));
        assert!(!page.contains("max="));
        for field in ["recipient", "subject", "body", "attachment", "repeat"] {
            assert!(page.contains(&format!(r#"name="{field}""#)), "missing {field}");
        }
        assert!(!page.contains("class=\"flash"));
    }

    #[test]
    fn repeat_input_carries_configured_limit() {
        let page = render_form(None, Some(25)).into_string();

        assert!(page.contains(r#"max="25""#));
    }
}
