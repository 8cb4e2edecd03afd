//! Message dialog shown at the end of a request: a notice, an error or a
//! confirmation question, optionally forwarding to another page.

use handlebars::RenderError;
use serde_json::json;
use storage::StoreTransaction;
use tracing::{error, warn};

use crate::{
    l10n::Localization,
    page::{render, HtmlPage, PageContext},
};

const MESSAGE_TEMPLATE: &str = include_str!("../markup/message.hbs");
const BUTTONS_TEMPLATE: &str = include_str!("../markup/message_buttons.hbs");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonMode {
    None,
    Back,
    Forward,
    YesNo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    FullPage,
    InlineFragment,
    Modal,
    TextOnly,
    HtmlTextOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardTarget {
    pub url: String,
    pub delay_ms: u64,
}

/// Final body of a message response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedMessage {
    PlainText(String),
    Markup(String),
    Page(String),
}

impl RenderedMessage {
    pub fn body(&self) -> &str {
        match self {
            Self::PlainText(body) | Self::Markup(body) | Self::Page(body) => body,
        }
    }

    pub fn into_body(self) -> String {
        match self {
            Self::PlainText(body) | Self::Markup(body) | Self::Page(body) => body,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::PlainText(_) => "text/plain; charset=utf-8",
            Self::Markup(_) | Self::Page(_) => "text/html; charset=utf-8",
        }
    }
}

pub struct MessagePresenter<'a> {
    l10n: &'a Localization,
    page: PageContext,
    forward: Option<ForwardTarget>,
    confirm_forward: bool,
    show_buttons: bool,
    modal: bool,
    response_started: bool,
    text_only: bool,
    html_text_only: bool,
    include_theme_chrome: bool,
    transaction: Option<StoreTransaction>,
}

impl<'a> MessagePresenter<'a> {
    pub fn new(l10n: &'a Localization, page: PageContext) -> Self {
        Self {
            l10n,
            page,
            forward: None,
            confirm_forward: false,
            show_buttons: true,
            modal: false,
            response_started: false,
            text_only: false,
            html_text_only: false,
            include_theme_chrome: true,
            transaction: None,
        }
    }

    pub fn hide_buttons(mut self) -> Self {
        self.show_buttons = false;
        self
    }

    /// Renders the dialog markup of a modal window; implies inline output.
    pub fn enable_modal_mode(mut self) -> Self {
        self.modal = true;
        self
    }

    pub fn set_forward_target(mut self, url: impl Into<String>, delay_ms: u64) -> Self {
        self.forward = Some(ForwardTarget {
            url: url.into(),
            delay_ms,
        });
        self
    }

    /// Asks the user before forwarding. A delay set earlier is kept.
    pub fn set_forward_with_confirmation(mut self, url: impl Into<String>) -> Self {
        let delay_ms = self.forward.as_ref().map_or(0, |target| target.delay_ms);
        self.forward = Some(ForwardTarget {
            url: url.into(),
            delay_ms,
        });
        self.confirm_forward = true;
        self
    }

    pub fn set_text_only(mut self) -> Self {
        self.text_only = true;
        self
    }

    pub fn set_html_only(mut self) -> Self {
        self.html_text_only = true;
        self
    }

    pub fn set_suppress_theme_chrome(mut self) -> Self {
        self.include_theme_chrome = false;
        self
    }

    /// Part of the response is already out; the message can only be appended inline.
    pub fn set_response_started(mut self) -> Self {
        self.response_started = true;
        self
    }

    /// The pending transaction is rolled back before the message is rendered.
    pub fn with_open_transaction(mut self, transaction: StoreTransaction) -> Self {
        self.transaction = Some(transaction);
        self
    }

    pub fn is_inline(&self) -> bool {
        self.modal || self.response_started
    }

    pub fn button_mode(&self) -> ButtonMode {
        if !self.show_buttons {
            return ButtonMode::None;
        }
        match (&self.forward, self.confirm_forward, self.modal) {
            (Some(_), true, _) => ButtonMode::YesNo,
            (Some(_), false, _) => ButtonMode::Forward,
            (None, _, false) => ButtonMode::Back,
            (None, _, true) => ButtonMode::None,
        }
    }

    pub fn display_mode(&self) -> DisplayMode {
        if self.text_only {
            DisplayMode::TextOnly
        } else if self.html_text_only {
            DisplayMode::HtmlTextOnly
        } else if self.modal {
            DisplayMode::Modal
        } else if self.is_inline() {
            DisplayMode::InlineFragment
        } else {
            DisplayMode::FullPage
        }
    }

    #[must_use]
    pub async fn render(mut self, content: &str, headline: Option<&str>) -> RenderedMessage {
        if let Some(transaction) = self.transaction.take() {
            if let Err(error) = transaction.rollback().await {
                warn!(%error, "failed to roll back open transaction");
            }
        }

        let headline = match headline {
            Some(headline) if !headline.is_empty() => headline.to_string(),
            _ => self.l10n.get("SYS_NOTE"),
        };

        let rendered = match self.display_mode() {
            DisplayMode::TextOnly => return RenderedMessage::PlainText(strip_tags(content)),
            DisplayMode::HtmlTextOnly => return RenderedMessage::Markup(content.to_string()),
            DisplayMode::Modal | DisplayMode::InlineFragment => self
                .message_html(content, &headline)
                .map(RenderedMessage::Markup),
            DisplayMode::FullPage => self.full_page(content, &headline).map(RenderedMessage::Page),
        };
        rendered.unwrap_or_else(|err| {
            error!(error = %err, "message could not be rendered");
            RenderedMessage::PlainText(strip_tags(content))
        })
    }

    fn full_page(&self, content: &str, headline: &str) -> Result<String, RenderError> {
        let mut page = HtmlPage::new("admidio-message", headline, self.page.clone());
        page.hide_menu();
        if !self.include_theme_chrome {
            page.hide_theme_html();
        }
        if let Some(target) = self.forward.as_ref().filter(|target| target.delay_ms > 0) {
            page.add_javascript(redirect_script(&target.url, target.delay_ms));
        }
        page.add_html(&self.message_html(content, headline)?);
        page.show()
    }

    /// `content` is inserted as markup; the headline is escaped.
    fn message_html(&self, content: &str, headline: &str) -> Result<String, RenderError> {
        let buttons = self.buttons_html()?;
        render(
            MESSAGE_TEMPLATE,
            &json!({
                "modal": self.modal,
                "inline": self.is_inline(),
                "headline": headline,
                "close": self.l10n.get("SYS_CLOSE"),
                "content": content,
                "buttons": buttons,
            }),
        )
    }

    fn buttons_html(&self) -> Result<String, RenderError> {
        let mode = self.button_mode();
        if mode == ButtonMode::None {
            return Ok(String::new());
        }
        let forward_url = self
            .forward
            .as_ref()
            .map(|target| target.url.as_str())
            .unwrap_or_default();
        render(
            BUTTONS_TEMPLATE,
            &json!({
                "yes_no": mode == ButtonMode::YesNo,
                "forward": mode == ButtonMode::Forward,
                "back": mode == ButtonMode::Back,
                "theme_url": self.page.theme_url(),
                "forward_url": forward_url,
                "forward_js": js_string(forward_url),
                "yes": self.l10n.get("SYS_YES"),
                "no": self.l10n.get("SYS_NO"),
                "next": self.l10n.get("SYS_NEXT"),
                "back_label": self.l10n.get("SYS_BACK"),
            }),
        )
    }
}

fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string())
        .to_string()
        .replace("</", "<\\/")
}

fn redirect_script(url: &str, delay_ms: u64) -> String {
    format!(
        "setTimeout(function() {{ window.location.href = {}; }}, {delay_ms});",
        js_string(url)
    )
}

/// Drops every `<...>` tag and keeps the text between them.
pub fn strip_tags(content: &str) -> String {
    let mut text = String::with_capacity(content.len());
    let mut in_tag = false;
    for c in content.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text
}

#[cfg(test)]
#[path = "tests/message_tests.rs"]
mod tests;
