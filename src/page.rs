//! Status page rendering
//!
//! Turns a registry snapshot into the HTML page served to every client. The
//! shell is fixed; only the title and the table rows are substituted.

use crate::gpio::PinReading;

pub const DEFAULT_TITLE: &str = "ESP8266 Pins";

/// Render the page with the default title.
///
/// # Example
///
/// ```
/// # use pinpage::gpio::PinReading;
/// # use pinpage::page::render;
/// let html = render(&[PinReading { id: 2, value: 1 }]);
/// let text = String::from_utf8(html).unwrap();
/// assert!(text.contains("<tr><td>2</td><td>1</td></tr>"));
/// ```
pub fn render(snapshot: &[PinReading]) -> Vec<u8> {
    render_titled(DEFAULT_TITLE, snapshot)
}

/// Render the page with `title` as both the document title and heading.
///
/// Output depends only on the arguments, so equal snapshots give
/// byte-identical pages.
pub fn render_titled(title: &str, snapshot: &[PinReading]) -> Vec<u8> {
    let title = escape(title);
    let rows = snapshot
        .iter()
        .map(row)
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "<!DOCTYPE html>\n\
         <html>\n    \
         <head> <title>{title}</title> </head>\n    \
         <body> <h1>{title}</h1>\n        \
         <table border=\"1\"> <tr><th>Pin</th><th>Value</th></tr> {rows} </table>\n    \
         </body>\n\
         </html>\n"
    )
    .into_bytes()
}

fn row(reading: &PinReading) -> String {
    format!("<tr><td>{}</td><td>{}</td></tr>", reading.id, reading.value)
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
