//! HTML rendering for the interactive pages

use std::fmt::Write;

use super::forms::{BookForm, FieldErrors};
use crate::models::{book::BookPage, user::UserClaims};

/// Escape text for HTML element and attribute content
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

/// Percent-encode a query string value
fn encode_query(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            b' ' => out.push('+'),
            _ => {
                let _ = write!(out, "%{:02X}", b);
            }
        }
    }
    out
}

fn layout(title: &str, user: Option<&UserClaims>, body: &str) -> String {
    let session = match user {
        Some(claims) => format!(
            r#"<span>Logged in as <strong>{}</strong> ({})</span>
      <form method="post" action="/logout" class="inline"><button type="submit">Log out</button></form>"#,
            escape(claims.username()),
            claims.role
        ),
        None => r#"<a href="/login">Log in</a>"#.to_string(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{title}</title>
  <style>
    body {{ font-family: sans-serif; margin: 2rem; }}
    table {{ border-collapse: collapse; width: 100%; }}
    th, td {{ border: 1px solid #ccc; padding: .4rem; text-align: left; }}
    .error {{ color: #b00020; font-size: .9rem; }}
    .inline {{ display: inline; }}
    header {{ display: flex; justify-content: space-between; margin-bottom: 1rem; }}
  </style>
</head>
<body>
  <header>
    <a href="/books">Catalog</a>
    <div>{session}</div>
  </header>
  <main>
{body}
  </main>
</body>
</html>
"#,
        title = escape(title),
        session = session,
        body = body
    )
}

/// Filter values echoed back into the list page
#[derive(Debug, Clone, Default)]
pub struct ListFilters {
    pub title: Option<String>,
    pub brand: Option<String>,
    pub year: Option<i32>,
}

impl ListFilters {
    fn query_for_page(&self, page: i64, size: i64) -> String {
        let mut query = format!("page={}&size={}", page, size);
        if let Some(ref title) = self.title {
            let _ = write!(query, "&title={}", encode_query(title));
        }
        if let Some(ref brand) = self.brand {
            let _ = write!(query, "&brand={}", encode_query(brand));
        }
        if let Some(year) = self.year {
            let _ = write!(query, "&year={}", year);
        }
        query
    }
}

pub fn book_list(page: &BookPage, filters: &ListFilters, user: Option<&UserClaims>) -> String {
    let is_admin = user.map_or(false, UserClaims::is_admin);
    let mut body = String::new();

    let _ = write!(
        body,
        r#"    <h1>Books</h1>
    <form method="get" action="/books">
      <input name="title" placeholder="Title" value="{}">
      <input name="brand" placeholder="Brand" value="{}">
      <input name="year" placeholder="Year" value="{}">
      <input type="hidden" name="size" value="{}">
      <button type="submit">Filter</button>
      <a href="/books">Reset</a>
    </form>
"#,
        escape(filters.title.as_deref().unwrap_or("")),
        escape(filters.brand.as_deref().unwrap_or("")),
        filters.year.map(|y| y.to_string()).unwrap_or_default(),
        page.size
    );

    if user.is_some() {
        body.push_str("    <p><a href=\"/books/new\">Add book</a></p>\n");
    }

    if page.items.is_empty() {
        body.push_str("    <p>No books found.</p>\n");
    } else {
        body.push_str(
            "    <table>\n      <tr><th>Vendor code</th><th>Title</th><th>Brand</th><th>Year</th><th>Stock</th><th>Price</th>",
        );
        if is_admin {
            body.push_str("<th></th>");
        }
        body.push_str("</tr>\n");

        for book in &page.items {
            let _ = write!(
                body,
                "      <tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>",
                escape(&book.vendor_code),
                escape(&book.title),
                escape(&book.brand),
                book.year,
                book.stock.map(|s| s.to_string()).unwrap_or_default(),
                book.price.map(|p| p.to_string()).unwrap_or_default(),
            );
            if is_admin {
                let _ = write!(
                    body,
                    r#"<td><a href="/books/edit/{id}">Edit</a> <form method="post" action="/books/delete/{id}" class="inline"><button type="submit">Delete</button></form></td>"#,
                    id = book.id
                );
            }
            body.push_str("</tr>\n");
        }
        body.push_str("    </table>\n");
    }

    let _ = write!(
        body,
        "    <p>Page {} of {} ({} books)</p>\n    <nav>",
        if page.total_pages == 0 { 0 } else { page.page.saturating_add(1) },
        page.total_pages,
        page.total
    );
    if page.has_previous() {
        let _ = write!(
            body,
            r#"<a href="/books?{}">Previous</a> "#,
            escape(&filters.query_for_page(page.page - 1, page.size))
        );
    }
    if page.has_next() {
        let _ = write!(
            body,
            r#"<a href="/books?{}">Next</a>"#,
            escape(&filters.query_for_page(page.page + 1, page.size))
        );
    }
    body.push_str("</nav>\n");

    layout("Books", user, &body)
}

fn field(label: &str, name: &str, value: &str, errors: &FieldErrors) -> String {
    let mut html = format!(
        r#"      <p><label>{label}<br><input name="{name}" value="{value}"></label>"#,
        label = escape(label),
        name = name,
        value = escape(value)
    );
    for message in errors.get(name) {
        let _ = write!(html, r#"<br><span class="error">{}</span>"#, escape(message));
    }
    html.push_str("</p>\n");
    html
}

/// Create form when `book_id` is `None`, edit form otherwise
pub fn book_form(
    book_id: Option<i64>,
    form: &BookForm,
    errors: &FieldErrors,
    user: Option<&UserClaims>,
) -> String {
    let (heading, action) = match book_id {
        Some(id) => ("Edit book".to_string(), format!("/books/update/{}", id)),
        None => ("New book".to_string(), "/books/save".to_string()),
    };

    let mut body = format!(
        "    <h1>{}</h1>\n    <form method=\"post\" action=\"{}\">\n",
        escape(&heading),
        action
    );
    body.push_str(&field("Vendor code", "vendor_code", &form.vendor_code, errors));
    body.push_str(&field("Title", "title", &form.title, errors));
    body.push_str(&field("Brand", "brand", &form.brand, errors));
    body.push_str(&field("Year", "year", &form.year, errors));
    body.push_str(&field("Stock", "stock", &form.stock, errors));
    body.push_str(&field("Price", "price", &form.price, errors));
    body.push_str("      <button type=\"submit\">Save</button> <a href=\"/books\">Cancel</a>\n    </form>\n");

    layout(&heading, user, &body)
}

pub fn login(error: Option<&str>, logged_out: bool) -> String {
    let mut body = String::from("    <h1>Log in</h1>\n");
    if logged_out {
        body.push_str("    <p>You have been logged out.</p>\n");
    }
    if let Some(message) = error {
        let _ = writeln!(body, r#"    <p class="error">{}</p>"#, escape(message));
    }
    body.push_str(
        r#"    <form method="post" action="/login">
      <p><label>Username<br><input name="username" autocomplete="username"></label></p>
      <p><label>Password<br><input type="password" name="password" autocomplete="current-password"></label></p>
      <button type="submit">Log in</button>
    </form>
"#,
    );
    layout("Log in", None, &body)
}

pub fn error_page(status: u16, message: &str, user: Option<&UserClaims>) -> String {
    let body = format!(
        "    <h1>Error {}</h1>\n    <p>{}</p>\n    <p><a href=\"/books\">Back to catalog</a></p>\n",
        status,
        escape(message)
    );
    layout("Error", user, &body)
}
