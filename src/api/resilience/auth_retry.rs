//! Resource manager decorator that refreshes credentials on authentication failures

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::retry::{CredentialRefresh, run_with_retry};
use crate::api::manager::{ManagementResult, ProgressFn, ResourceManager};
use crate::api::models::{
    AffinityGroup, BlobContainer, BlobDirectory, BlobFile, BlobItem, BlobUpload, CloudService,
    Location, NewVirtualMachine, Property, Queue, QueueMessage, StorageAccount, Table,
    TableEntity, VirtualMachine, VirtualMachineImage, VirtualMachineSize, VirtualNetwork,
};

/// Wraps another `ResourceManager` and gives every operation one refresh-and-retry cycle
/// when it is rejected with HTTP 401.
///
/// Holds no mutable state of its own, so one instance can be shared across tasks.
pub struct AuthRetryManager<M> {
    inner: M,
    refresher: Arc<dyn CredentialRefresh>,
}

impl<M: ResourceManager> AuthRetryManager<M> {
    pub fn new(inner: M, refresher: Arc<dyn CredentialRefresh>) -> Self {
        Self { inner, refresher }
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }
}

#[async_trait]
impl<M: ResourceManager> ResourceManager for AuthRetryManager<M> {
    async fn list_cloud_services(&self, subscription_id: &str) -> ManagementResult<Vec<CloudService>> {
        run_with_retry(self.refresher.as_ref(), subscription_id, "list_cloud_services", move || {
            self.inner.list_cloud_services(subscription_id)
        })
        .await
    }

    async fn create_cloud_service(&self, service: &CloudService) -> ManagementResult<()> {
        run_with_retry(self.refresher.as_ref(), &service.subscription_id, "create_cloud_service", move || {
            self.inner.create_cloud_service(service)
        })
        .await
    }

    async fn create_service_certificate(
        &self,
        subscription_id: &str,
        service_name: &str,
        data: &[u8],
        password: &str,
    ) -> ManagementResult<String> {
        run_with_retry(self.refresher.as_ref(), subscription_id, "create_service_certificate", move || {
            self.inner.create_service_certificate(subscription_id, service_name, data, password)
        })
        .await
    }

    async fn list_virtual_machines(&self, subscription_id: &str) -> ManagementResult<Vec<VirtualMachine>> {
        run_with_retry(self.refresher.as_ref(), subscription_id, "list_virtual_machines", move || {
            self.inner.list_virtual_machines(subscription_id)
        })
        .await
    }

    async fn refresh_virtual_machine(&self, vm: &VirtualMachine) -> ManagementResult<VirtualMachine> {
        run_with_retry(self.refresher.as_ref(), &vm.subscription_id, "refresh_virtual_machine", move || {
            self.inner.refresh_virtual_machine(vm)
        })
        .await
    }

    async fn start_virtual_machine(&self, vm: &VirtualMachine) -> ManagementResult<()> {
        run_with_retry(self.refresher.as_ref(), &vm.subscription_id, "start_virtual_machine", move || {
            self.inner.start_virtual_machine(vm)
        })
        .await
    }

    async fn shutdown_virtual_machine(&self, vm: &VirtualMachine, deallocate: bool) -> ManagementResult<()> {
        run_with_retry(self.refresher.as_ref(), &vm.subscription_id, "shutdown_virtual_machine", move || {
            self.inner.shutdown_virtual_machine(vm, deallocate)
        })
        .await
    }

    async fn restart_virtual_machine(&self, vm: &VirtualMachine) -> ManagementResult<()> {
        run_with_retry(self.refresher.as_ref(), &vm.subscription_id, "restart_virtual_machine", move || {
            self.inner.restart_virtual_machine(vm)
        })
        .await
    }

    async fn delete_virtual_machine(&self, vm: &VirtualMachine, delete_from_storage: bool) -> ManagementResult<()> {
        run_with_retry(self.refresher.as_ref(), &vm.subscription_id, "delete_virtual_machine", move || {
            self.inner.delete_virtual_machine(vm, delete_from_storage)
        })
        .await
    }

    async fn download_rdp(&self, vm: &VirtualMachine) -> ManagementResult<Vec<u8>> {
        run_with_retry(self.refresher.as_ref(), &vm.subscription_id, "download_rdp", move || {
            self.inner.download_rdp(vm)
        })
        .await
    }

    async fn create_virtual_machine(
        &self,
        vm: &VirtualMachine,
        request: &NewVirtualMachine,
    ) -> ManagementResult<()> {
        run_with_retry(self.refresher.as_ref(), &vm.subscription_id, "create_virtual_machine", move || {
            self.inner.create_virtual_machine(vm, request)
        })
        .await
    }

    async fn list_virtual_machine_images(&self, subscription_id: &str) -> ManagementResult<Vec<VirtualMachineImage>> {
        run_with_retry(self.refresher.as_ref(), subscription_id, "list_virtual_machine_images", move || {
            self.inner.list_virtual_machine_images(subscription_id)
        })
        .await
    }

    async fn list_virtual_machine_sizes(&self, subscription_id: &str) -> ManagementResult<Vec<VirtualMachineSize>> {
        run_with_retry(self.refresher.as_ref(), subscription_id, "list_virtual_machine_sizes", move || {
            self.inner.list_virtual_machine_sizes(subscription_id)
        })
        .await
    }

    async fn list_locations(&self, subscription_id: &str) -> ManagementResult<Vec<Location>> {
        run_with_retry(self.refresher.as_ref(), subscription_id, "list_locations", move || {
            self.inner.list_locations(subscription_id)
        })
        .await
    }

    async fn list_affinity_groups(&self, subscription_id: &str) -> ManagementResult<Vec<AffinityGroup>> {
        run_with_retry(self.refresher.as_ref(), subscription_id, "list_affinity_groups", move || {
            self.inner.list_affinity_groups(subscription_id)
        })
        .await
    }

    async fn list_virtual_networks(&self, subscription_id: &str) -> ManagementResult<Vec<VirtualNetwork>> {
        run_with_retry(self.refresher.as_ref(), subscription_id, "list_virtual_networks", move || {
            self.inner.list_virtual_networks(subscription_id)
        })
        .await
    }

    async fn list_storage_accounts(&self, subscription_id: &str) -> ManagementResult<Vec<StorageAccount>> {
        run_with_retry(self.refresher.as_ref(), subscription_id, "list_storage_accounts", move || {
            self.inner.list_storage_accounts(subscription_id)
        })
        .await
    }

    async fn create_storage_account(&self, account: &StorageAccount) -> ManagementResult<()> {
        run_with_retry(self.refresher.as_ref(), &account.subscription_id, "create_storage_account", move || {
            self.inner.create_storage_account(account)
        })
        .await
    }

    async fn refresh_storage_account(&self, account: &StorageAccount) -> ManagementResult<StorageAccount> {
        run_with_retry(self.refresher.as_ref(), &account.subscription_id, "refresh_storage_account", move || {
            self.inner.refresh_storage_account(account)
        })
        .await
    }

    async fn delete_storage_account(&self, account: &StorageAccount) -> ManagementResult<()> {
        run_with_retry(self.refresher.as_ref(), &account.subscription_id, "delete_storage_account", move || {
            self.inner.delete_storage_account(account)
        })
        .await
    }

    async fn list_blob_containers(&self, account: &StorageAccount) -> ManagementResult<Vec<BlobContainer>> {
        run_with_retry(self.refresher.as_ref(), &account.subscription_id, "list_blob_containers", move || {
            self.inner.list_blob_containers(account)
        })
        .await
    }

    async fn create_blob_container(
        &self,
        account: &StorageAccount,
        container: &BlobContainer,
    ) -> ManagementResult<BlobContainer> {
        run_with_retry(self.refresher.as_ref(), &account.subscription_id, "create_blob_container", move || {
            self.inner.create_blob_container(account, container)
        })
        .await
    }

    async fn delete_blob_container(&self, account: &StorageAccount, container: &BlobContainer) -> ManagementResult<()> {
        run_with_retry(self.refresher.as_ref(), &account.subscription_id, "delete_blob_container", move || {
            self.inner.delete_blob_container(account, container)
        })
        .await
    }

    async fn get_root_directory(
        &self,
        account: &StorageAccount,
        container: &BlobContainer,
    ) -> ManagementResult<BlobDirectory> {
        run_with_retry(self.refresher.as_ref(), &account.subscription_id, "get_root_directory", move || {
            self.inner.get_root_directory(account, container)
        })
        .await
    }

    async fn list_blob_items(
        &self,
        account: &StorageAccount,
        directory: &BlobDirectory,
    ) -> ManagementResult<Vec<BlobItem>> {
        run_with_retry(self.refresher.as_ref(), &account.subscription_id, "list_blob_items", move || {
            self.inner.list_blob_items(account, directory)
        })
        .await
    }

    async fn create_blob_directory(
        &self,
        account: &StorageAccount,
        parent: &BlobDirectory,
        directory: &BlobDirectory,
    ) -> ManagementResult<BlobDirectory> {
        run_with_retry(self.refresher.as_ref(), &account.subscription_id, "create_blob_directory", move || {
            self.inner.create_blob_directory(account, parent, directory)
        })
        .await
    }

    async fn create_blob_file(
        &self,
        account: &StorageAccount,
        parent: &BlobDirectory,
        file: &BlobFile,
    ) -> ManagementResult<BlobFile> {
        run_with_retry(self.refresher.as_ref(), &account.subscription_id, "create_blob_file", move || {
            self.inner.create_blob_file(account, parent, file)
        })
        .await
    }

    async fn delete_blob_file(&self, account: &StorageAccount, file: &BlobFile) -> ManagementResult<()> {
        run_with_retry(self.refresher.as_ref(), &account.subscription_id, "delete_blob_file", move || {
            self.inner.delete_blob_file(account, file)
        })
        .await
    }

    async fn upload_blob_file_content(
        &self,
        account: &StorageAccount,
        container: &BlobContainer,
        path: &str,
        upload: &BlobUpload,
        progress: &ProgressFn,
    ) -> ManagementResult<()> {
        run_with_retry(self.refresher.as_ref(), &account.subscription_id, "upload_blob_file_content", move || {
            self.inner.upload_blob_file_content(account, container, path, upload, progress)
        })
        .await
    }

    async fn download_blob_file_content(
        &self,
        account: &StorageAccount,
        file: &BlobFile,
        destination: &Path,
    ) -> ManagementResult<()> {
        run_with_retry(self.refresher.as_ref(), &account.subscription_id, "download_blob_file_content", move || {
            self.inner.download_blob_file_content(account, file, destination)
        })
        .await
    }

    async fn list_queues(&self, account: &StorageAccount) -> ManagementResult<Vec<Queue>> {
        run_with_retry(self.refresher.as_ref(), &account.subscription_id, "list_queues", move || {
            self.inner.list_queues(account)
        })
        .await
    }

    async fn create_queue(&self, account: &StorageAccount, queue: &Queue) -> ManagementResult<Queue> {
        run_with_retry(self.refresher.as_ref(), &account.subscription_id, "create_queue", move || {
            self.inner.create_queue(account, queue)
        })
        .await
    }

    async fn delete_queue(&self, account: &StorageAccount, queue: &Queue) -> ManagementResult<()> {
        run_with_retry(self.refresher.as_ref(), &account.subscription_id, "delete_queue", move || {
            self.inner.delete_queue(account, queue)
        })
        .await
    }

    async fn list_queue_messages(&self, account: &StorageAccount, queue: &Queue) -> ManagementResult<Vec<QueueMessage>> {
        run_with_retry(self.refresher.as_ref(), &account.subscription_id, "list_queue_messages", move || {
            self.inner.list_queue_messages(account, queue)
        })
        .await
    }

    async fn clear_queue(&self, account: &StorageAccount, queue: &Queue) -> ManagementResult<()> {
        run_with_retry(self.refresher.as_ref(), &account.subscription_id, "clear_queue", move || {
            self.inner.clear_queue(account, queue)
        })
        .await
    }

    async fn create_queue_message(
        &self,
        account: &StorageAccount,
        message: &QueueMessage,
        ttl_seconds: u32,
    ) -> ManagementResult<()> {
        run_with_retry(self.refresher.as_ref(), &account.subscription_id, "create_queue_message", move || {
            self.inner.create_queue_message(account, message, ttl_seconds)
        })
        .await
    }

    async fn dequeue_first_queue_message(
        &self,
        account: &StorageAccount,
        queue: &Queue,
    ) -> ManagementResult<Option<QueueMessage>> {
        run_with_retry(self.refresher.as_ref(), &account.subscription_id, "dequeue_first_queue_message", move || {
            self.inner.dequeue_first_queue_message(account, queue)
        })
        .await
    }

    async fn list_tables(&self, account: &StorageAccount) -> ManagementResult<Vec<Table>> {
        run_with_retry(self.refresher.as_ref(), &account.subscription_id, "list_tables", move || {
            self.inner.list_tables(account)
        })
        .await
    }

    async fn create_table(&self, account: &StorageAccount, table: &Table) -> ManagementResult<Table> {
        run_with_retry(self.refresher.as_ref(), &account.subscription_id, "create_table", move || {
            self.inner.create_table(account, table)
        })
        .await
    }

    async fn delete_table(&self, account: &StorageAccount, table: &Table) -> ManagementResult<()> {
        run_with_retry(self.refresher.as_ref(), &account.subscription_id, "delete_table", move || {
            self.inner.delete_table(account, table)
        })
        .await
    }

    async fn list_table_entities(
        &self,
        account: &StorageAccount,
        table: &Table,
        filter: &str,
    ) -> ManagementResult<Vec<TableEntity>> {
        run_with_retry(self.refresher.as_ref(), &account.subscription_id, "list_table_entities", move || {
            self.inner.list_table_entities(account, table, filter)
        })
        .await
    }

    async fn create_table_entity(
        &self,
        account: &StorageAccount,
        table_name: &str,
        partition_key: &str,
        row_key: &str,
        properties: &HashMap<String, Property>,
    ) -> ManagementResult<TableEntity> {
        run_with_retry(self.refresher.as_ref(), &account.subscription_id, "create_table_entity", move || {
            self.inner.create_table_entity(account, table_name, partition_key, row_key, properties)
        })
        .await
    }

    async fn update_table_entity(&self, account: &StorageAccount, entity: &TableEntity) -> ManagementResult<TableEntity> {
        run_with_retry(self.refresher.as_ref(), &account.subscription_id, "update_table_entity", move || {
            self.inner.update_table_entity(account, entity)
        })
        .await
    }

    async fn delete_table_entity(&self, account: &StorageAccount, entity: &TableEntity) -> ManagementResult<()> {
        run_with_retry(self.refresher.as_ref(), &account.subscription_id, "delete_table_entity", move || {
            self.inner.delete_table_entity(account, entity)
        })
        .await
    }
}
