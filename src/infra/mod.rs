pub mod notify_client;
