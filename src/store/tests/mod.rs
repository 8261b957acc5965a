// src/store/tests/mod.rs

mod memory_tests;
