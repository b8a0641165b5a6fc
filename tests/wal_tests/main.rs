//! Write-ahead log tests
