mod scheduler_tests;
mod storage_coordinator_tests;
mod support;
