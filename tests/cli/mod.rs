//! CLI module tests.

mod args_test;
