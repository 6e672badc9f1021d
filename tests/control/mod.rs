//! Control plane client tests.

mod http_test;
