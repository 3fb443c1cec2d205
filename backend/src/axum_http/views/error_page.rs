use super::{CARD_STYLE, escape, layout};

pub fn render_error_page(title: &str, message: &str) -> String {
    let body = format!(
        r#"<div style="{CARD_STYLE}">
<h1 style="margin-top:0;">{}</h1>
<p>{}</p>
<p><a href="/admin/assinaturas">Back to subscriptions</a></p>
</div>"#,
        escape(title),
        escape(message),
    );
    layout(title, &body)
}
