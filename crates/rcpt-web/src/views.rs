//! Server-rendered HTML pages.

use rcpt_core::extract::rules::format_amount;
use rcpt_core::{Receipt, ReceiptSummary};
use rust_decimal::Decimal;

/// Escape a string for safe HTML insertion.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn money(value: Option<Decimal>) -> String {
    value.map(format_amount).unwrap_or_default()
}

fn layout(title: &str, body: &str) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!("<title>{}</title>\n", html_escape(title)));
    html.push_str("<link rel=\"stylesheet\" href=\"/static/styles.css\">\n");
    html.push_str("</head>\n<body>\n<main>\n");
    html.push_str(body);
    html.push_str("</main>\n</body>\n</html>\n");
    html
}

/// Receipt list with the upload form.
pub fn index_page(receipts: &[ReceiptSummary]) -> String {
    let mut body = String::new();

    body.push_str("<h1>Receipts</h1>\n");
    body.push_str("<section class=\"upload\">\n");
    body.push_str(
        "<form action=\"/upload\" method=\"post\" enctype=\"multipart/form-data\">\n\
         <label>Receipt file (txt, csv, pdf or image)\n\
         <input type=\"file\" name=\"receipt\" required></label>\n\
         <button type=\"submit\">Upload</button>\n\
         </form>\n",
    );
    body.push_str("</section>\n");

    if receipts.is_empty() {
        body.push_str("<p class=\"empty\">No receipts yet.</p>\n");
        return layout("Receipts", &body);
    }

    body.push_str("<p><a href=\"/export\">Export all as CSV</a></p>\n");
    body.push_str("<table class=\"receipts\">\n");
    body.push_str("<thead><tr><th>Store</th><th>Date</th><th>Total</th><th>Items</th><th>Added</th></tr></thead>\n<tbody>\n");
    for r in receipts {
        let store = r.store_name.as_deref().unwrap_or("Unknown store");
        body.push_str(&format!(
            "<tr><td><a href=\"/receipt/{}\">{}</a></td><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td>{}</td></tr>\n",
            r.id,
            html_escape(store),
            r.purchase_date.map(|d| d.to_string()).unwrap_or_default(),
            money(r.total),
            r.item_count,
            r.created_at.format("%Y-%m-%d %H:%M"),
        ));
    }
    body.push_str("</tbody>\n</table>\n");

    layout("Receipts", &body)
}

/// Edit page for a single receipt.
pub fn receipt_page(receipt: &Receipt) -> String {
    let id = receipt.id;
    let mut body = String::new();

    body.push_str("<p><a href=\"/\">&larr; All receipts</a></p>\n");
    body.push_str(&format!(
        "<h1>{}</h1>\n",
        html_escape(receipt.store_name.as_deref().unwrap_or("Unknown store"))
    ));

    body.push_str(&format!(
        "<form class=\"fields\" action=\"/receipt/{id}/update\" method=\"post\">\n\
         <label>Store <input name=\"store_name\" value=\"{}\"></label>\n\
         <label>Date <input type=\"date\" name=\"purchase_date\" value=\"{}\"></label>\n\
         <label>Total <input name=\"total\" inputmode=\"decimal\" value=\"{}\"></label>\n\
         <button type=\"submit\">Save</button>\n\
         </form>\n",
        html_escape(receipt.store_name.as_deref().unwrap_or_default()),
        receipt.purchase_date.map(|d| d.to_string()).unwrap_or_default(),
        money(receipt.total),
    ));

    body.push_str("<h2>Items</h2>\n");
    body.push_str("<table class=\"items\">\n");
    body.push_str("<thead><tr><th>Description</th><th>Qty</th><th>Unit price</th><th>Line total</th><th></th></tr></thead>\n<tbody>\n");
    for item in &receipt.items {
        let form = format!("item-{}", item.id);
        body.push_str(&format!(
            "<tr>\
             <td><input form=\"{form}\" name=\"description\" value=\"{}\"></td>\
             <td><input form=\"{form}\" name=\"quantity\" type=\"number\" min=\"1\" value=\"{}\"></td>\
             <td><input form=\"{form}\" name=\"unit_price\" inputmode=\"decimal\" value=\"{}\"></td>\
             <td class=\"num\">{}</td>\
             <td class=\"actions\">\
             <form id=\"{form}\" action=\"/receipt/{id}/items/{item_id}/update\" method=\"post\"><button type=\"submit\">Save</button></form>\
             <form action=\"/receipt/{id}/items/{item_id}/delete\" method=\"post\"><button type=\"submit\" class=\"danger\">Delete</button></form>\
             </td></tr>\n",
            html_escape(&item.description),
            item.quantity,
            item.unit_price,
            format_amount(item.line_total()),
            item_id = item.id,
        ));
    }
    body.push_str("</tbody>\n");

    let items_total = receipt.items_total();
    let mismatch = receipt.total.is_some_and(|t| !receipt.items.is_empty() && t != items_total);
    body.push_str(&format!(
        "<tfoot><tr><td colspan=\"3\">Items total</td><td class=\"num{}\">{}</td><td></td></tr></tfoot>\n",
        if mismatch { " mismatch" } else { "" },
        format_amount(items_total),
    ));
    body.push_str("</table>\n");

    body.push_str(&format!(
        "<form class=\"add-item\" action=\"/receipt/{id}/items/add\" method=\"post\">\n\
         <input name=\"description\" placeholder=\"Description\">\n\
         <input name=\"quantity\" type=\"number\" min=\"1\" value=\"1\">\n\
         <input name=\"unit_price\" inputmode=\"decimal\" placeholder=\"0.00\">\n\
         <button type=\"submit\">Add item</button>\n\
         </form>\n"
    ));

    body.push_str(&format!(
        "<div class=\"toolbar\">\n\
         <a class=\"button\" href=\"/receipt/{id}/export\">Export CSV</a>\n\
         <form action=\"/receipt/{id}/reparse\" method=\"post\"><button type=\"submit\">Parse again</button></form>\n\
         <form action=\"/receipt/{id}/delete\" method=\"post\"><button type=\"submit\" class=\"danger\">Delete receipt</button></form>\n\
         </div>\n"
    ));

    body.push_str("<h2>Source text</h2>\n");
    body.push_str(&format!("<pre class=\"raw\">{}</pre>\n", html_escape(&receipt.raw_text)));

    layout(receipt.store_name.as_deref().unwrap_or("Receipt"), &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rcpt_core::LineItem;
    use std::str::FromStr;

    fn receipt() -> Receipt {
        Receipt {
            id: 4,
            store_name: Some("<Tom & Jerry's>".to_string()),
            purchase_date: None,
            total: Some(Decimal::from_str("5.50").unwrap()),
            raw_text: "<script>alert(1)</script>".to_string(),
            created_at: Utc::now(),
            items: vec![LineItem {
                id: 9,
                receipt_id: 4,
                description: "Milk \"fresh\"".to_string(),
                unit_price: Decimal::from_str("3.5").unwrap(),
                quantity: 1,
            }],
        }
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#x27;");
    }

    #[test]
    fn test_receipt_page_escapes_user_text() {
        let html = receipt_page(&receipt());

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;Tom &amp; Jerry&#x27;s&gt;"));
        assert!(html.contains("Milk &quot;fresh&quot;"));
        assert!(html.contains("/receipt/4/items/9/delete"));
        assert!(html.contains("3.50"));
        assert!(html.contains("mismatch"));
    }

    #[test]
    fn test_unit_price_input_keeps_precision() {
        let mut receipt = receipt();
        receipt.items[0].unit_price = Decimal::from_str("0.125").unwrap();
        receipt.items[0].quantity = 8;

        let html = receipt_page(&receipt);

        assert!(html.contains("name=\"unit_price\" inputmode=\"decimal\" value=\"0.125\""));
        assert!(html.contains("<td class=\"num\">1.00</td>"));
    }

    #[test]
    fn test_empty_index() {
        let html = index_page(&[]);
        assert!(html.contains("No receipts yet."));
        assert!(html.contains("name=\"receipt\""));
    }
}
