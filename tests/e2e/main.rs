//! End-to-end scenarios: scripted server histories fetched into a real
//! on-disk repository.

mod harness;
