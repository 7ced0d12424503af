//! Capability interface of an Azure resource-management client
//!
//! Implemented by the transport-backed client supplied by the embedding application and by
//! [`AuthRetryManager`](super::resilience::AuthRetryManager), which decorates any other
//! implementation with token refresh.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

use super::error::ManagementError;
use super::models::{
    AffinityGroup, BlobContainer, BlobDirectory, BlobFile, BlobItem, BlobUpload, CloudService,
    Location, NewVirtualMachine, Property, Queue, QueueMessage, StorageAccount, Table,
    TableEntity, VirtualMachine, VirtualMachineImage, VirtualMachineSize, VirtualNetwork,
};

pub type ManagementResult<T> = Result<T, ManagementError>;

/// Progress callback for chunked blob transfers, receives bytes transferred so far
pub type ProgressFn = dyn Fn(u64) + Send + Sync;

#[async_trait]
pub trait ResourceManager: Send + Sync {
    // Compute
    async fn list_cloud_services(&self, subscription_id: &str) -> ManagementResult<Vec<CloudService>>;

    async fn create_cloud_service(&self, service: &CloudService) -> ManagementResult<()>;

    /// Uploads a PFX certificate to a cloud service and returns its thumbprint
    async fn create_service_certificate(
        &self,
        subscription_id: &str,
        service_name: &str,
        data: &[u8],
        password: &str,
    ) -> ManagementResult<String>;

    async fn list_virtual_machines(&self, subscription_id: &str) -> ManagementResult<Vec<VirtualMachine>>;

    /// Re-reads status and endpoints of a virtual machine
    async fn refresh_virtual_machine(&self, vm: &VirtualMachine) -> ManagementResult<VirtualMachine>;

    async fn start_virtual_machine(&self, vm: &VirtualMachine) -> ManagementResult<()>;

    async fn shutdown_virtual_machine(&self, vm: &VirtualMachine, deallocate: bool) -> ManagementResult<()>;

    async fn restart_virtual_machine(&self, vm: &VirtualMachine) -> ManagementResult<()>;

    async fn delete_virtual_machine(&self, vm: &VirtualMachine, delete_from_storage: bool) -> ManagementResult<()>;

    /// Remote desktop connection file for the machine
    async fn download_rdp(&self, vm: &VirtualMachine) -> ManagementResult<Vec<u8>>;

    async fn create_virtual_machine(
        &self,
        vm: &VirtualMachine,
        request: &NewVirtualMachine,
    ) -> ManagementResult<()>;

    async fn list_virtual_machine_images(&self, subscription_id: &str) -> ManagementResult<Vec<VirtualMachineImage>>;

    async fn list_virtual_machine_sizes(&self, subscription_id: &str) -> ManagementResult<Vec<VirtualMachineSize>>;

    async fn list_locations(&self, subscription_id: &str) -> ManagementResult<Vec<Location>>;

    async fn list_affinity_groups(&self, subscription_id: &str) -> ManagementResult<Vec<AffinityGroup>>;

    async fn list_virtual_networks(&self, subscription_id: &str) -> ManagementResult<Vec<VirtualNetwork>>;

    // Storage accounts
    async fn list_storage_accounts(&self, subscription_id: &str) -> ManagementResult<Vec<StorageAccount>>;

    async fn create_storage_account(&self, account: &StorageAccount) -> ManagementResult<()>;

    /// Re-reads keys and endpoints of a storage account
    async fn refresh_storage_account(&self, account: &StorageAccount) -> ManagementResult<StorageAccount>;

    async fn delete_storage_account(&self, account: &StorageAccount) -> ManagementResult<()>;

    // Blobs
    async fn list_blob_containers(&self, account: &StorageAccount) -> ManagementResult<Vec<BlobContainer>>;

    async fn create_blob_container(
        &self,
        account: &StorageAccount,
        container: &BlobContainer,
    ) -> ManagementResult<BlobContainer>;

    async fn delete_blob_container(&self, account: &StorageAccount, container: &BlobContainer) -> ManagementResult<()>;

    async fn get_root_directory(
        &self,
        account: &StorageAccount,
        container: &BlobContainer,
    ) -> ManagementResult<BlobDirectory>;

    async fn list_blob_items(
        &self,
        account: &StorageAccount,
        directory: &BlobDirectory,
    ) -> ManagementResult<Vec<BlobItem>>;

    async fn create_blob_directory(
        &self,
        account: &StorageAccount,
        parent: &BlobDirectory,
        directory: &BlobDirectory,
    ) -> ManagementResult<BlobDirectory>;

    async fn create_blob_file(
        &self,
        account: &StorageAccount,
        parent: &BlobDirectory,
        file: &BlobFile,
    ) -> ManagementResult<BlobFile>;

    async fn delete_blob_file(&self, account: &StorageAccount, file: &BlobFile) -> ManagementResult<()>;

    /// Uploads `upload.length` bytes from `upload.source` in blocks of at most
    /// `upload.max_block_size` bytes, reporting progress after every block
    async fn upload_blob_file_content(
        &self,
        account: &StorageAccount,
        container: &BlobContainer,
        path: &str,
        upload: &BlobUpload,
        progress: &ProgressFn,
    ) -> ManagementResult<()>;

    /// Writes the blob content to `destination`, truncating it first
    async fn download_blob_file_content(
        &self,
        account: &StorageAccount,
        file: &BlobFile,
        destination: &Path,
    ) -> ManagementResult<()>;

    // Queues
    async fn list_queues(&self, account: &StorageAccount) -> ManagementResult<Vec<Queue>>;

    async fn create_queue(&self, account: &StorageAccount, queue: &Queue) -> ManagementResult<Queue>;

    async fn delete_queue(&self, account: &StorageAccount, queue: &Queue) -> ManagementResult<()>;

    /// Peeks at messages without changing their visibility
    async fn list_queue_messages(&self, account: &StorageAccount, queue: &Queue) -> ManagementResult<Vec<QueueMessage>>;

    async fn clear_queue(&self, account: &StorageAccount, queue: &Queue) -> ManagementResult<()>;

    async fn create_queue_message(
        &self,
        account: &StorageAccount,
        message: &QueueMessage,
        ttl_seconds: u32,
    ) -> ManagementResult<()>;

    /// Removes and returns the first visible message, `None` on an empty queue
    async fn dequeue_first_queue_message(
        &self,
        account: &StorageAccount,
        queue: &Queue,
    ) -> ManagementResult<Option<QueueMessage>>;

    // Tables
    async fn list_tables(&self, account: &StorageAccount) -> ManagementResult<Vec<Table>>;

    async fn create_table(&self, account: &StorageAccount, table: &Table) -> ManagementResult<Table>;

    async fn delete_table(&self, account: &StorageAccount, table: &Table) -> ManagementResult<()>;

    /// Entities matching an OData `$filter` expression; an empty filter returns all
    async fn list_table_entities(
        &self,
        account: &StorageAccount,
        table: &Table,
        filter: &str,
    ) -> ManagementResult<Vec<TableEntity>>;

    async fn create_table_entity(
        &self,
        account: &StorageAccount,
        table_name: &str,
        partition_key: &str,
        row_key: &str,
        properties: &HashMap<String, Property>,
    ) -> ManagementResult<TableEntity>;

    async fn update_table_entity(&self, account: &StorageAccount, entity: &TableEntity) -> ManagementResult<TableEntity>;

    async fn delete_table_entity(&self, account: &StorageAccount, entity: &TableEntity) -> ManagementResult<()>;
}
