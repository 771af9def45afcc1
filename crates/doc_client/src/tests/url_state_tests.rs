use shared::{
    cursor::{UrlState, UrlUpdate},
    domain::PageToken,
};

use crate::url_state::UrlStateStore;

#[test]
fn url_store_only_notifies_on_change() {
    let store = UrlStateStore::default();
    let mut rx = store.subscribe();
    assert!(store.push_url(&UrlUpdate::page(PageToken::View(2))));
    assert!(rx.has_changed().expect("sender alive"));
    let _ = rx.borrow_and_update();

    assert!(!store.push_url(&UrlUpdate::page(PageToken::View(2))));
    assert!(!rx.has_changed().expect("sender alive"));
    assert_eq!(store.current().doc_page, Some(PageToken::View(2)));
}

#[test]
fn set_replaces_the_whole_state() {
    let store = UrlStateStore::default();
    store.push_url(&UrlUpdate::page(PageToken::View(2)));
    let parsed = UrlState::parse("/doc/abc#a1.s4.r2").expect("url");
    assert!(store.set(parsed.clone()));
    assert_eq!(store.current(), parsed);
    assert!(!store.set(parsed));
}
