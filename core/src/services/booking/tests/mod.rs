mod calendar_tests;
