//! In-tree test suites for the order book.
