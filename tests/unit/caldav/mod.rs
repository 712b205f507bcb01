mod parser_tests;
mod sync_tests;
