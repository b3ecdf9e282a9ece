//! Property-based tests for filters and subscription routes

use boardsync::shared::entity::{Entity, Filter};
use boardsync::shared::schema::{App, Room};
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_scope_key_ignores_insertion_order(
        a in "[a-z]{1,8}",
        b in "[a-z]{1,8}",
        va in "[a-z0-9]{1,8}",
        vb in "[a-z0-9]{1,8}",
    ) {
        prop_assume!(a != b);
        let left = Filter::eq(a.clone(), va.clone()).and(b.clone(), vb.clone());
        let right = Filter::eq(b, vb).and(a, va);
        prop_assert_eq!(left.scope_key(), right.scope_key());
    }

    #[test]
    fn test_board_scoped_route_names_the_board(board in "[a-zA-Z0-9]{1,24}") {
        let route = App::subscription_route(&Filter::eq("boardId", board.clone()));
        prop_assert_eq!(route, format!("/api/subscription/boards/{}", board));
    }

    #[test]
    fn test_unscoped_kinds_use_collection_route(key in "[a-z]{1,8}", value in "[a-z]{1,8}") {
        let route = Room::subscription_route(&Filter::eq(key, value));
        prop_assert_eq!(route, Room::ROUTE);
    }
}
