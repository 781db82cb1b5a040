//! Built-in rendering of content components, used when the application
//! ships no `mail::themes.{name}` view.

use std::fmt::Write;

use serde_json::Value;

use super::mailable::Component;
use super::markdown;
use crate::view::escape;

const STYLE: &str = "body{font-family:Helvetica,Arial,sans-serif;line-height:1.5;color:#333;margin:0;padding:20px}\
.container{max-width:580px;margin:0 auto}\
.action{text-align:center;margin:15px 0}\
.action a{display:inline-block;padding:8px 16px;background:#2d3748;color:#fff;text-decoration:none;border-radius:4px}\
.panel{padding:10px;border:1px solid #ddd;margin:10px 0}\
.table{width:100%;border-collapse:collapse;margin:10px 0}\
.table th,.table td{border:1px solid #ddd;padding:6px;text-align:left}\
.footer{text-align:center;font-size:11px;color:#999;margin-top:20px}";

fn cell(row: &serde_json::Map<String, Value>, column: &str) -> String {
    match row.get(column) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// An HTML document with the components followed by `body`, which is
/// inserted unescaped.
pub fn html(title: &str, components: &[Component], body: &str) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n<div class=\"container\">\n",
        escape(title),
        STYLE
    );
    for component in components {
        let _ = match component {
            Component::Greeting(text) => writeln!(out, "<h2>{}</h2>", escape(text)),
            Component::Line(text) => writeln!(out, "<p>{}</p>", escape(text)),
            Component::Action { text, url } => writeln!(
                out,
                "<div class=\"action\"><a href=\"{}\">{}</a></div>",
                escape(url),
                escape(text)
            ),
            Component::Panel(html) => writeln!(out, "<div class=\"panel\">{}</div>", html),
            Component::Table { data, columns } => {
                out.push_str("<table class=\"table\">\n<thead><tr>");
                for column in columns {
                    let _ = write!(out, "<th>{}</th>", escape(column));
                }
                out.push_str("</tr></thead>\n<tbody>\n");
                for row in data {
                    out.push_str("<tr>");
                    for column in columns {
                        let _ = write!(out, "<td>{}</td>", escape(&cell(row, column)));
                    }
                    out.push_str("</tr>\n");
                }
                writeln!(out, "</tbody>\n</table>")
            }
            Component::Signature(text) => writeln!(out, "<p>-- <br>{}</p>", escape(text)),
            Component::Footer(text) => writeln!(out, "<div class=\"footer\">{}</div>", escape(text)),
        };
    }
    out.push_str(body);
    out.push_str("</div>\n</body>\n</html>\n");
    out
}

/// Plain-text rendering of the components.
pub fn text(components: &[Component]) -> String {
    let mut out = String::new();
    for component in components {
        let _ = match component {
            Component::Greeting(text) | Component::Line(text) | Component::Footer(text) => {
                writeln!(out, "{}\n", text)
            }
            Component::Action { text, url } => writeln!(out, "{}: {}\n", text, url),
            Component::Panel(html) => writeln!(out, "{}\n", markdown::to_text(html)),
            Component::Table { data, columns } => {
                for row in data {
                    for column in columns {
                        let line = format!("{}: {}", column, cell(row, column));
                        let _ = writeln!(out, "{}", line.trim_end());
                    }
                    out.push_str("-----\n");
                }
                writeln!(out)
            }
            Component::Signature(text) => writeln!(out, "--\n{}\n", text),
        };
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::mail::Mailable;

    fn receipt() -> Mailable {
        Mailable::new()
            .greeting("Hello <Ada>!")
            .line("Your invoice was paid.")
            .action("View invoice", "https://shop.test/invoices/7?tab=1&x=2")
            .panel("Paid with <strong>card</strong>")
            .table(
                [json!({"item": "Pen", "qty": 3}), json!({"item": "Ink"})],
                ["item", "qty"],
            )
            .signature("The Shop")
    }

    #[test]
    fn test_components_to_html() {
        let html = html("Receipt", receipt().components(), "");
        assert!(html.starts_with("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n<title>Receipt</title>"));
        assert!(html.contains("<h2>Hello &lt;Ada&gt;!</h2>\n<p>Your invoice was paid.</p>\n"));
        assert!(html.contains(
            r#"<div class="action"><a href="https://shop.test/invoices/7?tab=1&amp;x=2">View invoice</a></div>"#
        ));
        assert!(html.contains(r#"<div class="panel">Paid with <strong>card</strong></div>"#));
        assert!(html.contains("<tr><td>Pen</td><td>3</td></tr>\n<tr><td>Ink</td><td></td></tr>\n"));
        assert!(html.ends_with("<p>-- <br>The Shop</p>\n</div>\n</body>\n</html>\n"));
    }

    #[test]
    fn test_components_to_text() {
        insta::assert_snapshot!(text(receipt().components()), @r"
        Hello <Ada>!

        Your invoice was paid.

        View invoice: https://shop.test/invoices/7?tab=1&x=2

        Paid with card

        item: Pen
        qty: 3
        -----
        item: Ink
        qty:
        -----

        --
        The Shop
        ");
    }
}
