//! Printable QR label sheets. Labels are written as a standalone HTML page;
//! the QR images themselves are rendered by the qrserver.com image API, so
//! the page needs network access when opened.

use std::fmt::{self, Write as _};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::Utc;
use chrono_tz::Europe::Brussels;

use crate::types::Product;

#[derive(Debug)]
pub enum LabelError {
    Io(std::io::Error),
    /// The product has no code to print.
    NoCode(String),
}

impl fmt::Display for LabelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelError::Io(e) => write!(f, "io error: {}", e),
            LabelError::NoCode(name) => write!(f, "geen QR code voor product: {}", name),
        }
    }
}

impl std::error::Error for LabelError {}

impl From<std::io::Error> for LabelError {
    fn from(value: std::io::Error) -> Self {
        LabelError::Io(value)
    }
}

const QR_IMAGE_SIZE: u32 = 120;

fn qr_image_url(code: &str) -> String {
    format!(
        "https://api.qrserver.com/v1/create-qr-code/?size={size}x{size}&data={data}",
        size = QR_IMAGE_SIZE,
        data = percent_encode(code)
    )
}

fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => {
                let _ = write!(encoded, "%{:02X}", byte);
            }
        }
    }
    encoded
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub fn sanitize_filename(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            result.push(ch);
        } else {
            result.push('_');
        }
    }
    if result.is_empty() {
        "product".to_string()
    } else {
        result
    }
}

fn label_sheet_html<'a, I>(title: &str, labels: I) -> String
where
    I: Iterator<Item = (&'a str, &'a str)>,
{
    let generated = Utc::now()
        .with_timezone(&Brussels)
        .format("%d-%m-%Y")
        .to_string();

    let mut html = String::new();
    writeln!(
        html,
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title>\
<style>body{{font-family:Arial,sans-serif;padding:20px}}h1{{margin-bottom:0}}\
.labels{{display:flex;flex-wrap:wrap;gap:16px;margin-top:16px}}\
.label{{border:1px solid #555;padding:12px;width:180px;text-align:center;page-break-inside:avoid}}\
.label p{{margin:8px 0 0;font-size:13px;word-wrap:break-word}}\
.code{{font-family:monospace;font-size:12px;color:#555}}</style></head><body>",
        title = escape_html(title)
    )
    .expect("write to string");
    writeln!(
        html,
        "<h1>{}</h1><h2>Gegenereerd op {}</h2><div class=\"labels\">",
        escape_html(title),
        generated
    )
    .expect("write to string");

    let mut count = 0;
    for (name, code) in labels {
        writeln!(
            html,
            "<div class=\"label\"><img src=\"{url}\" width=\"{size}\" height=\"{size}\" alt=\"{code}\">\
<p>{name}</p><p class=\"code\">{code}</p></div>",
            url = qr_image_url(code),
            size = QR_IMAGE_SIZE,
            name = escape_html(name),
            code = escape_html(code)
        )
        .expect("write to string");
        count += 1;
    }
    if count == 0 {
        html.push_str("<p>Geen producten met een QR code.</p>");
    }

    html.push_str("</div></body></html>");
    html
}

/// Writes one label per product that has a code; products without a code are
/// left off the sheet.
pub fn write_label_sheet(path: &Path, products: &[Product]) -> Result<usize, LabelError> {
    let labels: Vec<(&str, &str)> = products
        .iter()
        .filter_map(|p| p.qrcode.as_deref().map(|code| (p.name.as_str(), code)))
        .collect();
    let count = labels.len();

    let html = label_sheet_html("QR labels", labels.into_iter());
    let mut file = File::create(path)?;
    file.write_all(html.as_bytes())?;
    Ok(count)
}

/// Single-product label, for reprints.
pub fn write_product_label(path: &Path, product: &Product) -> Result<(), LabelError> {
    let Some(code) = product.qrcode.as_deref() else {
        return Err(LabelError::NoCode(product.name.clone()));
    };

    let html = label_sheet_html(&product.name, std::iter::once((product.name.as_str(), code)));
    let mut file = File::create(path)?;
    file.write_all(html.as_bytes())?;
    Ok(())
}
