use super::*;

const SHIPPED_STORES: &str = include_str!("../../../config/stores.yaml");

fn minimal_store_yaml(slug: &str) -> String {
    format!(
        r#"
  - slug: {slug}
    name: Test Store
    store_id: 9
    base_url: https://www.example.cl
    target_url: https://www.example.cl/despensa
    output_file: test.json
    container: div.card
    fields:
      name:
        - from: child_text
          selector: p.name
      price:
        - from: child_text
          selector: span.price
      url:
        - from: attribute
          name: href
    inclusion: positive_price
    dedup: source_url
"#
    )
}

fn stores_doc(entries: &[String]) -> String {
    format!("stores:{}", entries.concat())
}

#[test]
fn shipped_stores_file_is_valid() {
    let stores = parse_stores(SHIPPED_STORES).expect("shipped config should validate");
    let slugs: Vec<&str> = stores.stores.iter().map(|s| s.slug.as_str()).collect();
    assert_eq!(slugs, vec!["lider", "jumbo", "unimarc", "santa-isabel"]);
}

#[test]
fn shipped_stores_keep_digit_limit_only_where_prices_render_with_separators() {
    let stores = parse_stores(SHIPPED_STORES).unwrap();
    let limited: Vec<&str> = stores
        .stores
        .iter()
        .filter(|s| s.fields.price_digit_limit == Some(4))
        .map(|s| s.slug.as_str())
        .collect();
    assert_eq!(limited, vec!["lider", "santa-isabel"]);
}

#[test]
fn shipped_lider_keeps_zero_price_items_and_tracks_stock() {
    let stores = parse_stores(SHIPPED_STORES).unwrap();
    let lider = stores.find("lider").unwrap();
    assert_eq!(lider.inclusion, InclusionRule::Named);
    assert_eq!(lider.fields.unavailable_marker.as_deref(), Some("Agotado"));
    assert_eq!(lider.fields.image_lazy_attribute.as_deref(), Some("data-src"));
    assert!(matches!(
        lider.setup.as_slice(),
        [SetupStep::Dismiss { .. }, SetupStep::SelectLocation { comuna, .. }] if comuna == "Independencia"
    ));
}

#[test]
fn shipped_unimarc_parses_field_sources() {
    let stores = parse_stores(SHIPPED_STORES).unwrap();
    let unimarc = stores.find("unimarc").unwrap();
    assert_eq!(unimarc.dedup, DedupStrategy::NameAndPrice);
    assert_eq!(
        unimarc.fields.name,
        vec![
            FieldSource::Attribute {
                name: "title".to_string()
            },
            FieldSource::ChildAttribute {
                selector: Selector::new("img"),
                name: "alt".to_string()
            },
        ]
    );
    assert!(matches!(
        unimarc.fields.price.last(),
        Some(FieldSource::TextPattern { pattern }) if pattern == r"\$\s?[\d\.]+"
    ));
    assert!(matches!(
        unimarc.fields.price_scope.as_ref().map(Selector::kind),
        Some(SelectorKind::XPath(expr)) if expr.starts_with("ancestor::div")
    ));
    assert_eq!(unimarc.scroll.as_ref().map(|s| s.stall_threshold), Some(5));
    assert_eq!(unimarc.container_key_attribute.as_deref(), Some("href"));
}

#[test]
fn shipped_jumbo_scrolls_with_load_more_button() {
    let stores = parse_stores(SHIPPED_STORES).unwrap();
    let jumbo = stores.find("JUMBO").expect("lookup is case-insensitive");
    let scroll = jumbo.scroll.as_ref().unwrap();
    assert_eq!(scroll.stall_threshold, 3);
    assert_eq!(scroll.bounce_offset, 700);
    assert!(scroll.load_more.is_some());
    assert!(scroll.max_rounds.is_none());
    assert_eq!(jumbo.fields.price_format, PriceFormat::Decimal);
    assert_eq!(jumbo.category, "Despensa");
    assert_eq!(jumbo.on_scroll_failure, FailurePolicy::Continue);
}

#[test]
fn shipped_stores_other_than_jumbo_abort_on_scroll_failure() {
    let stores = parse_stores(SHIPPED_STORES).unwrap();
    for slug in ["lider", "unimarc", "santa-isabel"] {
        let store = stores.find(slug).unwrap();
        assert_eq!(store.on_scroll_failure, FailurePolicy::Abort, "{slug}");
    }
}

#[test]
fn defaults_apply_to_optional_fields() {
    let stores = parse_stores(&stores_doc(&[minimal_store_yaml("test")])).unwrap();
    let store = &stores.stores[0];
    assert_eq!(store.category, "Despensa");
    assert_eq!(store.catalog_timeout_ms, 20_000);
    assert_eq!(store.on_missing_catalog, FailurePolicy::Continue);
    assert_eq!(store.on_scroll_failure, FailurePolicy::Abort);
    assert!(store.container_key_attribute.is_none());
    assert!(store.setup.is_empty());
    assert!(store.scroll.is_none());
    assert_eq!(store.fields.brand_fallback, BrandFallback::FirstToken);
    assert_eq!(store.fields.price_format, PriceFormat::Digits);
    assert_eq!(store.fields.description, DescriptionStyle::Name);
    assert!(!store.fields.url_fallback_to_page);
}

#[test]
fn selector_kind_splits_css_and_xpath() {
    assert_eq!(Selector::new("a.card").kind(), SelectorKind::Css("a.card"));
    assert_eq!(
        Selector::new("xpath=//button[1]").kind(),
        SelectorKind::XPath("//button[1]")
    );
}

#[test]
fn validate_rejects_duplicate_slugs() {
    let doc = stores_doc(&[minimal_store_yaml("dup"), minimal_store_yaml("dup")]);
    let err = parse_stores(&doc).unwrap_err();
    assert!(err.to_string().contains("duplicate store slug"), "{err}");
}

#[test]
fn validate_rejects_uppercase_slug() {
    let err = parse_stores(&stores_doc(&[minimal_store_yaml("Jumbo")])).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)), "{err:?}");
}

#[test]
fn validate_rejects_non_http_target() {
    let doc = stores_doc(&[minimal_store_yaml("ftp")])
        .replace("https://www.example.cl/despensa", "ftp://www.example.cl/despensa");
    let err = parse_stores(&doc).unwrap_err();
    assert!(err.to_string().contains("target_url"), "{err}");
}

#[test]
fn validate_rejects_positive_price_rule_without_price_source() {
    let doc = stores_doc(&[minimal_store_yaml("noprice")]).replace(
        "      price:\n        - from: child_text\n          selector: span.price\n",
        "",
    );
    let err = parse_stores(&doc).unwrap_err();
    assert!(err.to_string().contains("no price source"), "{err}");
}

#[test]
fn validate_rejects_zero_stall_threshold() {
    let doc = stores_doc(&[minimal_store_yaml("stall")]).replace(
        "    inclusion: positive_price",
        "    scroll:\n      settle_ms: 10\n      stall_threshold: 0\n      bounce_offset: 400\n      bounce_settle_ms: 10\n    inclusion: positive_price",
    );
    let err = parse_stores(&doc).unwrap_err();
    assert!(err.to_string().contains("stall_threshold"), "{err}");
}

#[test]
fn validate_rejects_blank_container_key_attribute() {
    let doc = stores_doc(&[minimal_store_yaml("blankkey")]).replace(
        "    container: div.card\n",
        "    container: div.card\n    container_key_attribute: ' '\n",
    );
    let err = parse_stores(&doc).unwrap_err();
    assert!(err.to_string().contains("container_key_attribute"), "{err}");
}

#[test]
fn scroll_and_catalog_policies_parse_independently() {
    let doc = stores_doc(&[minimal_store_yaml("policy")]).replace(
        "    inclusion: positive_price",
        "    on_missing_catalog: abort\n    on_scroll_failure: continue\n    inclusion: positive_price",
    );
    let stores = parse_stores(&doc).unwrap();
    assert_eq!(stores.stores[0].on_missing_catalog, FailurePolicy::Abort);
    assert_eq!(stores.stores[0].on_scroll_failure, FailurePolicy::Continue);
}

#[test]
fn parse_rejects_unknown_field_source() {
    let doc = stores_doc(&[minimal_store_yaml("bad")]).replace("from: attribute", "from: sibling");
    let err = parse_stores(&doc).unwrap_err();
    assert!(matches!(err, ConfigError::StoresFileParse(_)), "{err:?}");
}

#[test]
fn load_stores_reports_missing_file() {
    let err = load_stores(Path::new("/nonexistent/stores.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::StoresFileIo { .. }), "{err:?}");
}
