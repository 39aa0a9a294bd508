//! End-to-end tests for `saml2-sp` live under `tests/`.
