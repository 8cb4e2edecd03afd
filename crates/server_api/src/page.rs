//! Themed HTML page shell and a small form builder, both rendered through
//! handlebars. Values are escaped by the engine; only the templates decide
//! where already rendered markup is inserted verbatim.

use std::sync::OnceLock;

use handlebars::{Handlebars, RenderError};
use serde::Serialize;
use serde_json::json;
use url::{form_urlencoded, Url};

pub use handlebars::html_escape as escape_html;

const PAGE_TEMPLATE: &str = include_str!("../markup/page.hbs");
const FORM_TEMPLATE: &str = include_str!("../markup/form.hbs");

fn engine() -> &'static Handlebars<'static> {
    static ENGINE: OnceLock<Handlebars<'static>> = OnceLock::new();
    ENGINE.get_or_init(Handlebars::new)
}

pub fn render<T: Serialize>(template: &str, data: &T) -> Result<String, RenderError> {
    engine().render_template(template, data)
}

/// Everything a page needs to know about the installation it is rendered for.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub base_url: String,
    pub theme: String,
    pub organization_name: String,
    pub language: String,
}

impl PageContext {
    pub fn theme_url(&self) -> String {
        encode_url(&self.base_url, &format!("themes/{}", self.theme), &[])
    }

    pub fn url(&self, path: &str, params: &[(&str, &str)]) -> String {
        encode_url(&self.base_url, path, params)
    }
}

/// Joins `path` onto `base` and appends url-encoded query parameters.
pub fn encode_url(base: &str, path: &str, params: &[(&str, &str)]) -> String {
    let joined = Url::parse(base).and_then(|base| base.join(path));
    match joined {
        Ok(mut url) => {
            if !params.is_empty() {
                url.query_pairs_mut().extend_pairs(params.iter().copied());
            }
            url.to_string()
        }
        Err(_) => {
            let mut url = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
            if !params.is_empty() {
                url.push('?');
                url.push_str(
                    &form_urlencoded::Serializer::new(String::new())
                        .extend_pairs(params.iter().copied())
                        .finish(),
                );
            }
            url
        }
    }
}

pub struct HtmlPage {
    id: String,
    headline: String,
    context: PageContext,
    body: String,
    scripts: Vec<String>,
    show_menu: bool,
    include_theme_chrome: bool,
}

impl HtmlPage {
    pub fn new(id: &str, headline: &str, context: PageContext) -> Self {
        Self {
            id: id.to_string(),
            headline: headline.to_string(),
            context,
            body: String::new(),
            scripts: Vec::new(),
            show_menu: true,
            include_theme_chrome: true,
        }
    }

    pub fn hide_menu(&mut self) {
        self.show_menu = false;
    }

    /// Leaves out the theme header and footer.
    pub fn hide_theme_html(&mut self) {
        self.include_theme_chrome = false;
    }

    /// Inserted unescaped into a `<script>` element.
    pub fn add_javascript(&mut self, script: impl Into<String>) {
        self.scripts.push(script.into());
    }

    /// Appends rendered markup to the page body.
    pub fn add_html(&mut self, html: &str) {
        self.body.push_str(html);
    }

    pub fn show(self) -> Result<String, RenderError> {
        let ctx = &self.context;
        render(
            PAGE_TEMPLATE,
            &json!({
                "id": self.id,
                "language": ctx.language,
                "organization": ctx.organization_name,
                "headline": self.headline,
                "theme_url": ctx.theme_url(),
                "base_url": ctx.base_url,
                "scripts": self.scripts,
                "chrome": self.include_theme_chrome,
                "menu": self.show_menu,
                "body": self.body,
            }),
        )
    }
}

#[derive(Debug, Serialize)]
struct SelectOption {
    value: String,
    text: String,
    selected: bool,
}

/// One form control; the variant name selects the template section.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum FormField {
    Hidden {
        name: String,
        value: String,
    },
    Input {
        name: String,
        label: String,
        value: String,
        input_type: String,
        max_length: Option<usize>,
        required: bool,
    },
    Checkbox {
        name: String,
        label: String,
        checked: bool,
    },
    Select {
        name: String,
        label: String,
        options: Vec<SelectOption>,
    },
    Textarea {
        name: String,
        label: String,
        value: String,
        rows: u32,
    },
    Link {
        id: String,
        href: String,
        label: String,
    },
    Submit {
        id: String,
        label: String,
        icon: String,
    },
}

pub struct HtmlForm {
    id: String,
    action: String,
    fields: Vec<FormField>,
}

impl HtmlForm {
    pub fn new(id: &str, action: &str) -> Self {
        Self {
            id: id.to_string(),
            action: action.to_string(),
            fields: Vec::new(),
        }
    }

    pub fn add_hidden(&mut self, name: &str, value: &str) {
        self.fields.push(FormField::Hidden {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    pub fn add_input(
        &mut self,
        name: &str,
        label: &str,
        value: &str,
        input_type: &str,
        max_length: Option<usize>,
        required: bool,
    ) {
        self.fields.push(FormField::Input {
            name: name.to_string(),
            label: label.to_string(),
            value: value.to_string(),
            input_type: input_type.to_string(),
            max_length,
            required,
        });
    }

    pub fn add_checkbox(&mut self, name: &str, label: &str, checked: bool) {
        self.fields.push(FormField::Checkbox {
            name: name.to_string(),
            label: label.to_string(),
            checked,
        });
    }

    pub fn add_select(&mut self, name: &str, label: &str, options: &[(String, String)], selected: &str) {
        let options = options
            .iter()
            .map(|(value, text)| SelectOption {
                value: value.clone(),
                text: text.clone(),
                selected: value == selected,
            })
            .collect();
        self.fields.push(FormField::Select {
            name: name.to_string(),
            label: label.to_string(),
            options,
        });
    }

    pub fn add_textarea(&mut self, name: &str, label: &str, value: &str, rows: u32) {
        self.fields.push(FormField::Textarea {
            name: name.to_string(),
            label: label.to_string(),
            value: value.to_string(),
            rows,
        });
    }

    /// Button-styled link shown between the fields.
    pub fn add_link(&mut self, id: &str, href: &str, label: &str) {
        self.fields.push(FormField::Link {
            id: id.to_string(),
            href: href.to_string(),
            label: label.to_string(),
        });
    }

    pub fn add_submit_button(&mut self, id: &str, label: &str, icon: &str) {
        self.fields.push(FormField::Submit {
            id: id.to_string(),
            label: label.to_string(),
            icon: icon.to_string(),
        });
    }

    pub fn show(self) -> Result<String, RenderError> {
        render(
            FORM_TEMPLATE,
            &json!({
                "id": self.id,
                "action": self.action,
                "fields": self.fields,
            }),
        )
    }
}
