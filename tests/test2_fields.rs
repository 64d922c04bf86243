#![cfg(feature = "sqlite")]

use chrono::NaiveDateTime;
use sql_rowbind::commas::Commas;
use sql_rowbind::fields::{BindableField, FieldValue};
use sql_rowbind::manifest;
use sql_rowbind::query::Manifest;
use sql_rowbind::quote::{quote, quote_opt};

manifest! {
    BookRow with BookRowAccess {
        primary id: i64 => ("id", "books"),
        updateable title: String => ("title", "books"),
        field pages: i64 => ("pages", "books"),
    }
}

#[test]
fn commas_emit_space_then_commas() {
    let mut sep = Commas::new();
    assert_eq!(sep.get(), ' ');
    assert_eq!(sep.get(), ',');
    assert_eq!(sep.get(), ',');
    assert_eq!(sep.times_called(), 3);
    sep.reset();
    assert_eq!(sep.get(), ' ');
}

#[test]
fn quoting_doubles_embedded_quotes() {
    assert_eq!(quote("plain"), "'plain'");
    assert_eq!(quote("O'Brien"), "'O''Brien'");
    assert_eq!(quote(""), "''");
    assert_eq!(quote_opt(None), "''");
    assert_eq!(quote_opt(Some("x")), "'x'");
}

#[test]
fn integers_parse_forgivingly() {
    assert_eq!(i64::from_text(Some("42")), 42);
    assert_eq!(i64::from_text(Some(" 42 ")), 42);
    assert_eq!(i64::from_text(Some("not a number")), 0);
    assert_eq!(i64::from_text(None), 0);
    assert_eq!(u32::from_text(Some("-1")), 0);
    assert_eq!(f64::from_text(Some("2.5")), 2.5);
}

#[test]
fn booleans_accept_common_renderings() {
    for text in ["t", "T", "true", "TRUE", "y", "Y", "1"] {
        assert!(bool::from_text(Some(text)), "{text} should read as true");
    }
    for text in ["f", "F", "false", "n", "0", ""] {
        assert!(!bool::from_text(Some(text)), "{text} should read as false");
    }
    assert!(!bool::from_text(None));
    assert_eq!(true.to_literal(), "true");
    assert_eq!(false.to_literal(), "false");
}

#[test]
fn timestamps_parse_with_and_without_millis() {
    let plain = NaiveDateTime::from_text(Some("2024-01-02 03:04:05"));
    assert_eq!(plain.to_literal(), "'2024-01-02 03:04:05'");

    let millis = NaiveDateTime::from_text(Some("2024-01-02 03:04:05.250"));
    assert_eq!(millis.to_literal(), "'2024-01-02 03:04:05.250'");

    assert_eq!(NaiveDateTime::from_text(Some("garbage")), NaiveDateTime::UNIX_EPOCH);
    assert_eq!(NaiveDateTime::from_text(None), NaiveDateTime::UNIX_EPOCH);
}

#[test]
fn string_literals_are_quoted() {
    assert_eq!(String::from("O'Brien").to_literal(), "'O''Brien'");
    assert_eq!(String::from_text(None), "");
}

#[test]
fn manifest_macro_records_columns_in_order() {
    let fields = BookRow::FIELDS;
    assert_eq!(fields.len(), 3);
    assert_eq!(fields[0].column, "id");
    assert!(fields[0].primary);
    assert_eq!(fields[1].column, "title");
    assert_eq!(fields[1].table, "books");
    assert!(!fields[1].primary);
    assert!(!fields[2].primary);
}

#[test]
fn detached_fields_carry_fallbacks_and_refuse_assignment() {
    let title = BookRow::title();
    assert_eq!(title.get(), "");
    assert!(!title.set("New Title".to_string()), "no row to write back to");
    assert_eq!(title.get(), "", "refused assignment must not store the value");
    assert!(!title.sync());

    let pages = BookRow::pages();
    assert_eq!(pages.get(), 0);
    assert_eq!(BindableField::literal(&pages), "0");
}

#[test]
fn field_clones_share_their_value_slot() {
    let pages = BookRow::pages();
    let twin = pages.clone();
    assert_eq!(pages.slot_key(), twin.slot_key());
    assert_ne!(pages.slot_key(), BookRow::pages().slot_key());
}
