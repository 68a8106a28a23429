//! Unit test harness for vmem-infrastructure.

mod config_tests;
