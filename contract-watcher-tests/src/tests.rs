mod checked_headers;
mod event_repository;
