//! Resource models shared by every `ResourceManager` implementation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Hosted cloud service (deployment container for roles and virtual machines)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudService {
    pub name: String,
    pub label: String,
    pub description: String,
    pub location: String,
    pub affinity_group: Option<String>,
    pub subscription_id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VirtualMachineStatus {
    Starting,
    Ready,
    Restarting,
    Stopping,
    Stopped,
    Deallocated,
    Deleting,
    #[default]
    Unknown,
}

/// Public endpoint exposed by a virtual machine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub name: String,
    pub protocol: String,
    pub private_port: u16,
    pub public_port: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VirtualMachine {
    pub name: String,
    pub service_name: String,
    pub deployment_name: String,
    pub availability_set: Option<String>,
    pub size: String,
    pub status: VirtualMachineStatus,
    pub endpoints: Vec<Endpoint>,
    pub subscription_id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatingSystem {
    #[default]
    Windows,
    Linux,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VirtualMachineImage {
    pub name: String,
    pub label: String,
    pub publisher: String,
    pub operating_system: OperatingSystem,
    pub location: String,
    pub published_at: Option<DateTime<Utc>>,
    pub recommended_size: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VirtualMachineSize {
    pub name: String,
    pub label: String,
    pub cores: u32,
    pub memory_mb: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AffinityGroup {
    pub name: String,
    pub label: String,
    pub location: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VirtualNetwork {
    pub name: String,
    pub id: String,
    pub affinity_group: Option<String>,
    pub subnets: Vec<String>,
}

/// Where the OS disk of a new virtual machine is placed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiskPlacement {
    /// New disk blob inside this storage account
    StorageAccount(StorageAccount),
    /// Explicit blob URL for the disk
    MediaLocation(String),
}

/// Everything needed to provision a virtual machine besides the machine itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVirtualMachine {
    pub image: VirtualMachineImage,
    pub disk: DiskPlacement,
    pub virtual_network: Option<String>,
    pub username: String,
    pub password: String,
    pub certificate: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageAccount {
    pub name: String,
    pub label: String,
    pub description: String,
    pub location: String,
    pub affinity_group: Option<String>,
    pub account_type: String,
    pub primary_key: Option<String>,
    pub blob_endpoint: Option<String>,
    pub queue_endpoint: Option<String>,
    pub table_endpoint: Option<String>,
    pub subscription_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlobContainer {
    pub name: String,
    pub uri: String,
    pub etag: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub public_read_access: bool,
}

/// Virtual directory inside a container; the root directory has an empty path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlobDirectory {
    pub name: String,
    pub uri: String,
    pub container_name: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlobFile {
    pub name: String,
    pub uri: String,
    pub container_name: String,
    pub path: String,
    pub content_type: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlobItem {
    Directory(BlobDirectory),
    File(BlobFile),
}

impl BlobItem {
    pub fn name(&self) -> &str {
        match self {
            BlobItem::Directory(directory) => &directory.name,
            BlobItem::File(file) => &file.name,
        }
    }
}

/// Source for a blob upload. The file is reopened on every attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobUpload {
    pub source: PathBuf,
    pub max_block_size: usize,
    pub length: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Queue {
    pub name: String,
    pub uri: String,
    pub approximate_message_count: u64,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub id: String,
    pub queue_name: String,
    pub content: String,
    pub inserted_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub dequeue_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub uri: String,
}

/// Typed table entity property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Property {
    String(String),
    Int32(i32),
    Int64(i64),
    Double(f64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    Guid(uuid::Uuid),
    Binary(Vec<u8>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableEntity {
    pub partition_key: String,
    pub row_key: String,
    pub table_name: String,
    pub etag: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub properties: HashMap<String, Property>,
}
