//! Common regex patterns for receipt extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Dates
    pub static ref DATE_DMY: Regex = Regex::new(
        r"\b(\d{1,2})[./\-](\d{1,2})[./\-](\d{4}|\d{2})\b"
    ).unwrap();

    pub static ref DATE_YMD: Regex = Regex::new(
        r"\b(\d{4})[./\-](\d{1,2})[./\-](\d{1,2})\b"
    ).unwrap();

    pub static ref DATE_LONG: Regex = Regex::new(
        r"(?i)\b(\d{1,2})\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?,?\s+(\d{4})\b"
    ).unwrap();

    // Money: 3.50, 3,50, 1,234.56, 1.234,56, 1 234,56, -0.99
    pub static ref AMOUNT_PATTERN: Regex = Regex::new(
        r"(-)?(\d{1,3}(?:[,.]\d{3})+|\d{1,3}(?:[ \u{00a0}]\d{3})+|\d+)[,.](\d{2})"
    ).unwrap();

    pub static ref CURRENCY_TOKEN: Regex = Regex::new(
        r"(?i)(?:[$€£¥₽]|\b(?:pln|zł|eur|usd|gbp|rub|руб|р)\b\.?)"
    ).unwrap();

    // Header lines
    pub static ref STORE_LABEL: Regex = Regex::new(
        r"(?i)^\s*(?:store|shop|merchant|seller|магазин|sklep|sprzedawca)\s*[:\-]\s*(.+?)\s*$"
    ).unwrap();

    // Totals
    pub static ref TOTAL_KEYWORD: Regex = Regex::new(
        r"(?i)\b(?:grand\s+total|total|amount\s+due|balance\s+due|итого|сумма|к\s+оплате|razem|suma|do\s+zap[łl]aty|summe|gesamt)\b"
    ).unwrap();

    pub static ref SUBTOTAL_KEYWORD: Regex = Regex::new(
        r"(?i)\b(?:sub\s*-?\s*total|zwischensumme|podsuma)\b"
    ).unwrap();

    // Payment, tax and change lines are never items
    pub static ref NON_ITEM_KEYWORD: Regex = Regex::new(
        r"(?i)\b(?:tax|vat|gst|hst|change|cash|card|visa|mastercard|amex|debit|credit|tender(?:ed)?|payment|paid|rounding|сдача|наличные|карта|ндс|reszta|got[óo]wka|karta|ptu|mwst|rückgeld)\b"
    ).unwrap();

    // Quantities: "2 x 1.50", "2*1,50", "3 @ 0.99"
    pub static ref QTY_TIMES: Regex = Regex::new(
        r"(?i)\b(\d{1,4})\s*[x×х*@]\s*(\d+[.,]\d{2})"
    ).unwrap();

    // Leading "2 x Milk"
    pub static ref QTY_PREFIX: Regex = Regex::new(
        r"(?i)^(\d{1,3})\s*[x×х*]\s+(\S.*)$"
    ).unwrap();

    // Trailing "Milk 2 x" left over once the amounts are cut off
    pub static ref QTY_SUFFIX: Regex = Regex::new(
        r"(?i)\s*\b\d{1,4}\s*[x×х*@]\s*$"
    ).unwrap();

    pub static ref WHITESPACE_RUN: Regex = Regex::new(r"\s{2,}").unwrap();
}
