mod gateway_tests;
mod hub_tests;
