mod extract_tests;
mod normalize_tests;
mod support;
