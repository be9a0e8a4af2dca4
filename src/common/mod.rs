pub mod langflow;
pub mod network;
pub mod openwebui;
