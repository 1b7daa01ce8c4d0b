//! Unit tests for the store operations
//!
//! Tests cover:
//! - New as a pure append, duplicates included
//! - Update lookup, replacement and the unassigned-level exclusion
//! - Delete with cross-side reindexing and the empty-book outcome
//! - Depth queries with one-sided and skipped levels

use crate::utils::{count_at, ladder, levels_on, new_at};
use orderbook_store::{
    apply_instruction, BookRow, InstructionEvent, InstructionKind, OrderBookStore, PriceLevelIndex,
    Quote, Side, StoreError,
};
use rstest::rstest;

fn quote(price: f64, quantity: u64) -> Option<Quote> {
    Some(Quote { price, quantity })
}

#[cfg(test)]
mod new_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_is_additive() {
        let mut store = OrderBookStore::new();
        apply_instruction(&mut store, new_at(Side::Bid, 1, 50.0, 30)).unwrap();

        assert_eq!(store.len(), 1);
        let entry = &store.entries()[0];
        assert_eq!(entry.side, Side::Bid);
        assert_eq!(entry.price, 50.0);
        assert_eq!(entry.quantity, 30);
        assert_eq!(entry.price_level_index, PriceLevelIndex::new(1));
        assert_eq!(entry.instruction, InstructionKind::New);
    }

    #[test]
    fn test_new_without_level_is_unassigned() {
        let mut store = OrderBookStore::new();
        store.apply(InstructionEvent::add(Side::Ask, 61.5, 7)).unwrap();

        assert_eq!(store.entries()[0].price_level_index, PriceLevelIndex::UNASSIGNED);
        assert!(!store.entries()[0].price_level_index.is_assigned());
    }

    #[test]
    fn test_new_keeps_duplicates() {
        let mut store = OrderBookStore::new();
        store.apply(new_at(Side::Bid, 2, 40.0, 10)).unwrap();
        store.apply(new_at(Side::Bid, 2, 41.0, 20)).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(count_at(&store, Side::Bid, 2), 2);
    }
}

#[cfg(test)]
mod update_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_update_replaces_in_place() {
        let mut store = ladder(Side::Ask, 3);
        store.apply(InstructionEvent::update(Side::Ask, 70.0, 20, 2)).unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(count_at(&store, Side::Ask, 2), 1);
        let updated = store
            .entries()
            .iter()
            .find(|e| e.price_level_index == PriceLevelIndex::new(2))
            .unwrap();
        assert_eq!((updated.price, updated.quantity), (70.0, 20));
        assert_eq!(updated.instruction, InstructionKind::Update);
    }

    #[test]
    fn test_update_missing_level_fails_without_change() {
        let mut store = ladder(Side::Bid, 2);
        let before = store.entries().to_vec();

        let err = store
            .apply(InstructionEvent::update(Side::Bid, 10.0, 1, 5))
            .unwrap_err();

        assert_eq!(
            err,
            StoreError::LevelNotFound {
                side: Side::Bid,
                price_level_index: PriceLevelIndex::new(5),
            }
        );
        assert!(err.to_string().contains("price_level_index 5"));
        assert_eq!(store.entries(), before.as_slice());
    }

    #[test]
    fn test_update_is_side_specific() {
        let mut store = ladder(Side::Bid, 2);
        let err = store
            .apply(InstructionEvent::update(Side::Ask, 101.0, 1, 1))
            .unwrap_err();
        assert!(matches!(err, StoreError::LevelNotFound { side: Side::Ask, .. }));
    }

    #[test]
    fn test_update_never_targets_unassigned_level() {
        let mut store = OrderBookStore::new();
        store.apply(InstructionEvent::add(Side::Bid, 50.0, 30)).unwrap();

        let err = store
            .apply(InstructionEvent::update(Side::Bid, 55.0, 10, 0))
            .unwrap_err();

        assert!(matches!(err, StoreError::LevelNotFound { .. }));
        assert_eq!(store.entries()[0].price, 50.0);
    }

    #[test]
    fn test_update_takes_the_slot_of_the_first_duplicate() {
        let mut store = OrderBookStore::new();
        store.apply(new_at(Side::Bid, 2, 40.0, 10)).unwrap();
        store.apply(new_at(Side::Bid, 2, 41.0, 20)).unwrap();

        store.apply(InstructionEvent::update(Side::Bid, 42.0, 30, 2)).unwrap();

        let prices: Vec<f64> = store.entries().iter().map(|e| e.price).collect();
        assert_eq!(prices, vec![42.0, 41.0]);
        // The replaced entry is still the first at its level, so it is shown
        assert_eq!(store.order_book(2)[0].bid, quote(42.0, 30));
    }
}

#[cfg(test)]
mod delete_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[rstest]
    #[case(5, 1)]
    #[case(5, 3)]
    #[case(5, 5)]
    #[case(2, 1)]
    fn test_delete_removes_and_compacts(#[case] levels: u32, #[case] deleted: u32) {
        let mut store = ladder(Side::Bid, levels);
        store.apply(InstructionEvent::delete(deleted)).unwrap();

        assert_eq!(store.len(), (levels - 1) as usize);
        let expected: Vec<u32> = (1..levels).collect();
        assert_eq!(levels_on(&store, Side::Bid), expected);
    }

    #[test]
    fn test_delete_keeps_shallower_levels_untouched() {
        let mut store = ladder(Side::Ask, 4);
        store.apply(InstructionEvent::delete(3)).unwrap();

        let level_one = store
            .entries()
            .iter()
            .find(|e| e.price_level_index == PriceLevelIndex::new(1))
            .unwrap();
        assert_eq!(level_one.price, 101.0);

        // Former level 4 moved up
        let level_three = store
            .entries()
            .iter()
            .find(|e| e.price_level_index == PriceLevelIndex::new(3))
            .unwrap();
        assert_eq!(level_three.price, 104.0);
    }

    #[test]
    fn test_delete_reindexes_both_sides() {
        let mut store = OrderBookStore::new();
        for level in 1..=5 {
            store.apply(new_at(Side::Ask, level, 100.0 + f64::from(level), 1)).unwrap();
        }
        for level in [1, 2, 4, 5] {
            store.apply(new_at(Side::Bid, level, 100.0 - f64::from(level), 1)).unwrap();
        }

        store.apply(InstructionEvent::delete(3)).unwrap();

        assert_eq!(levels_on(&store, Side::Ask), vec![1, 2, 3, 4]);
        // Bid had no level 3 but still shifts
        assert_eq!(levels_on(&store, Side::Bid), vec![1, 2, 3, 4]);

        let ask_five = store.entries().iter().find(|e| e.side == Side::Ask && e.price == 105.0);
        let bid_five = store.entries().iter().find(|e| e.side == Side::Bid && e.price == 95.0);
        assert_eq!(ask_five.unwrap().price_level_index, PriceLevelIndex::new(4));
        assert_eq!(bid_five.unwrap().price_level_index, PriceLevelIndex::new(4));
    }

    #[test]
    fn test_delete_removes_duplicates_together() {
        let mut store = ladder(Side::Bid, 2);
        store.apply(new_at(Side::Bid, 2, 97.0, 5)).unwrap();

        store.apply(InstructionEvent::delete(2)).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(levels_on(&store, Side::Bid), vec![1]);
    }

    #[test]
    fn test_delete_absent_level_beyond_top_is_noop() {
        let mut store = ladder(Side::Bid, 3);
        let before = store.entries().to_vec();

        store.apply(InstructionEvent::delete(9)).unwrap();

        assert_eq!(store.entries().len(), before.len());
        assert_eq!(levels_on(&store, Side::Bid), vec![1, 2, 3]);
    }

    #[test]
    fn test_delete_unassigned_level_shifts_top_to_unassigned() {
        let mut store = ladder(Side::Bid, 3);
        store.apply(InstructionEvent::add(Side::Ask, 120.0, 9)).unwrap();

        store.apply(InstructionEvent::delete(0)).unwrap();

        let mut levels: Vec<(f64, u32)> = store
            .entries()
            .iter()
            .map(|e| (e.price, e.price_level_index.value()))
            .collect();
        levels.sort_by_key(|(_, level)| std::cmp::Reverse(*level));
        assert_eq!(levels, vec![(97.0, 2), (98.0, 1), (99.0, 0)]);

        // Former level 1 is now unassigned and cannot be updated
        let err = store
            .apply(InstructionEvent::update(Side::Bid, 99.5, 1, 0))
            .unwrap_err();
        assert!(matches!(err, StoreError::LevelNotFound { .. }));
        assert!(store.order_book(3).iter().all(|r| r.price_level_index.value() != 3));
    }

    #[test]
    fn test_delete_last_level_leaves_empty_book() {
        let mut store = ladder(Side::Ask, 1);
        store.apply(new_at(Side::Bid, 1, 99.0, 3)).unwrap();

        let err = store.apply(InstructionEvent::delete(1)).unwrap_err();

        assert_eq!(
            err,
            StoreError::EmptyBookAfterDelete {
                price_level_index: PriceLevelIndex::new(1),
            }
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_on_empty_book() {
        let mut store = OrderBookStore::new();
        let err = store.apply(InstructionEvent::delete(1)).unwrap_err();
        assert!(matches!(err, StoreError::EmptyBookAfterDelete { .. }));
    }
}

#[cfg(test)]
mod query_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_order_book_skips_and_marks_missing() {
        let mut store = OrderBookStore::new();
        store.apply(new_at(Side::Bid, 2, 48.0, 5)).unwrap();
        store.apply(new_at(Side::Ask, 5, 75.0, 8)).unwrap();

        let book = store.order_book(5);

        assert_eq!(
            book,
            vec![
                BookRow {
                    price_level_index: PriceLevelIndex::new(2),
                    ask: None,
                    bid: quote(48.0, 5),
                },
                BookRow {
                    price_level_index: PriceLevelIndex::new(5),
                    ask: quote(75.0, 8),
                    bid: None,
                },
            ]
        );
    }

    #[test]
    fn test_order_book_respects_depth() {
        let mut store = ladder(Side::Bid, 5);
        store.apply(new_at(Side::Ask, 4, 104.0, 1)).unwrap();

        let book = store.order_book(3);
        let levels: Vec<u32> = book.iter().map(|r| r.price_level_index.value()).collect();
        assert_eq!(levels, vec![1, 2, 3]);
        assert!(book.iter().all(|r| r.ask.is_none()));

        assert!(store.order_book(0).is_empty());
    }

    #[test]
    fn test_order_book_with_huge_depth_is_bounded_by_entries() {
        let mut store = ladder(Side::Ask, 50);
        store.apply(new_at(Side::Bid, 50, 1.0, 1)).unwrap();

        let started = std::time::Instant::now();
        let book = store.order_book(u32::MAX);

        assert!(started.elapsed() < std::time::Duration::from_secs(1));
        assert_eq!(book.len(), 50);
        assert_eq!(book[0].price_level_index, PriceLevelIndex::TOP);
        assert_eq!(book[49].bid, quote(1.0, 1));
        assert_eq!(book[49].ask, quote(150.0, 500));
    }

    #[test]
    fn test_order_book_shows_first_duplicate() {
        let mut store = OrderBookStore::new();
        store.apply(new_at(Side::Ask, 1, 60.0, 10)).unwrap();
        store.apply(new_at(Side::Ask, 1, 61.0, 11)).unwrap();

        assert_eq!(store.order_book(1)[0].ask, quote(60.0, 10));
    }

    #[test]
    fn test_order_book_ignores_unassigned_entries() {
        let mut store = OrderBookStore::new();
        store.apply(InstructionEvent::add(Side::Bid, 50.0, 30)).unwrap();
        assert!(store.order_book(10).is_empty());
    }

    #[test]
    fn test_missing_side_serializes_as_null() {
        let row = BookRow {
            price_level_index: PriceLevelIndex::new(1),
            ask: None,
            bid: quote(50.0, 40),
        };
        let json = serde_json::to_value(&row).unwrap();
        assert!(json["ask"].is_null());
        assert_eq!(json["bid"]["quantity"], 40);
    }

    #[test]
    fn test_end_to_end_scenario() {
        let mut store = OrderBookStore::new();
        let events = vec![
            new_at(Side::Bid, 1, 50.0, 30),
            new_at(Side::Bid, 2, 40.0, 40),
            new_at(Side::Ask, 1, 60.0, 10),
            new_at(Side::Ask, 2, 70.0, 10),
            InstructionEvent::update(Side::Ask, 70.0, 20, 2),
            InstructionEvent::update(Side::Bid, 50.0, 40, 1),
        ];
        assert_eq!(store.apply_all(events), Ok(6));

        assert_eq!(
            store.order_book(2),
            vec![
                BookRow {
                    price_level_index: PriceLevelIndex::new(1),
                    ask: quote(60.0, 10),
                    bid: quote(50.0, 40),
                },
                BookRow {
                    price_level_index: PriceLevelIndex::new(2),
                    ask: quote(70.0, 20),
                    bid: quote(40.0, 40),
                },
            ]
        );
    }
}

#[cfg(test)]
mod ingestion_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_json_record_defaults_level() {
        let event: InstructionEvent =
            serde_json::from_str(r#"{"instruction":"new","side":"ask","price":60.0,"quantity":10}"#)
                .unwrap();
        assert_eq!(event.price_level_index, PriceLevelIndex::UNASSIGNED);

        let delete: InstructionEvent =
            serde_json::from_str(r#"{"instruction":"delete","price_level_index":3}"#).unwrap();
        assert_eq!(delete.price_level_index, PriceLevelIndex::new(3));
        assert!(delete.side.is_none());
    }

    #[test]
    fn test_unknown_instruction_rejected() {
        let mut store = ladder(Side::Bid, 1);
        let mut event = InstructionEvent::update(Side::Bid, 1.0, 1, 1);
        event.instruction = "cross".to_string();

        let err = store.apply(event).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInstruction { .. }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_apply_all_stops_at_first_failure() {
        let mut store = OrderBookStore::new();
        let events = vec![
            new_at(Side::Bid, 1, 50.0, 30),
            InstructionEvent::update(Side::Ask, 60.0, 10, 1),
            new_at(Side::Ask, 1, 60.0, 10),
        ];

        let (position, err) = store.apply_all(events).unwrap_err();
        assert_eq!(position, 1);
        assert!(matches!(err, StoreError::LevelNotFound { side: Side::Ask, .. }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut store = ladder(Side::Ask, 3);
        store.clear();
        assert!(store.is_empty());
    }
}
