use super::{operation_status, FamilyResponseMapper, MapError, MapRequest};
use crate::spec::Family;
use crate::store::{DataAccess, ResourceGroup, VirtualMachine};
use http::Method;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

const VM_TYPE: &str = "Microsoft.Compute/virtualMachines";
const RG_TYPE: &str = "Microsoft.Resources/resourceGroups";
const POWER_ACTIONS: [&str; 5] = ["start", "restart", "deallocate", "poweroff", "stop"];

/// Sub-resource kind, decided from the route's path pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    OperationStatus,
    VirtualMachines,
    ResourceGroups,
    OperationsCatalogue,
    Other,
}

/// Classify a route. The most specific kind wins: a VM path also contains
/// `resourceGroups`, and a status poll also contains `operations`.
#[must_use]
pub fn classify(path_pattern: &str, method: &Method) -> ResourceKind {
    let lower = path_pattern.to_ascii_lowercase();
    if lower.contains("/operations/") && *method == Method::GET {
        ResourceKind::OperationStatus
    } else if lower.contains("virtualmachines") {
        ResourceKind::VirtualMachines
    } else if lower.contains("resourcegroups") {
        ResourceKind::ResourceGroups
    } else if lower.contains("/operations") {
        ResourceKind::OperationsCatalogue
    } else {
        ResourceKind::Other
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ArmVirtualMachine<'a> {
    id: &'a str,
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    location: &'a str,
    tags: &'a BTreeMap<String, String>,
    properties: VmProperties<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VmProperties<'a> {
    vm_id: &'a str,
    provisioning_state: &'a str,
    hardware_profile: Value,
    storage_profile: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    instance_view: Option<InstanceView>,
}

#[derive(Serialize)]
struct InstanceView {
    statuses: Vec<InstanceStatus>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InstanceStatus {
    code: String,
    level: &'static str,
    display_status: String,
}

/// `PowerState/<status>`; a stopped machine reports as deallocated.
#[must_use]
pub fn power_state_code(status: &str) -> String {
    if status.eq_ignore_ascii_case("stopped") {
        "PowerState/deallocated".to_string()
    } else {
        format!("PowerState/{status}")
    }
}

fn instance_view(vm: &VirtualMachine) -> InstanceView {
    InstanceView {
        statuses: vec![
            InstanceStatus {
                code: power_state_code(&vm.status),
                level: "Info",
                display_status: vm.power_state.clone(),
            },
            InstanceStatus {
                code: format!("ProvisioningState/{}", vm.provisioning_state),
                level: "Info",
                display_status: format!(
                    "Provisioning {}",
                    vm.provisioning_state.to_ascii_lowercase()
                ),
            },
        ],
    }
}

fn vm_payload(vm: &VirtualMachine, expand_instance_view: bool) -> Result<Value, MapError> {
    let payload = ArmVirtualMachine {
        id: &vm.id,
        name: &vm.name,
        kind: VM_TYPE,
        location: &vm.location,
        tags: &vm.tags,
        properties: VmProperties {
            vm_id: &vm.id,
            provisioning_state: &vm.provisioning_state,
            hardware_profile: json!({ "vmSize": vm.vm_size }),
            storage_profile: json!({ "osDisk": { "osType": vm.os_type } }),
            instance_view: expand_instance_view.then(|| instance_view(vm)),
        },
    };
    serde_json::to_value(payload).map_err(|e| MapError::Internal(e.to_string()))
}

fn group_payload(rg: &ResourceGroup) -> Value {
    json!({
        "id": rg.id,
        "name": rg.name,
        "type": RG_TYPE,
        "location": rg.location,
        "tags": rg.tags,
        "properties": { "provisioningState": "Succeeded" },
    })
}

fn is_power_action(req: &MapRequest<'_>) -> bool {
    let last = req
        .path_pattern
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    let op = req.operation_id.to_ascii_lowercase();
    POWER_ACTIONS
        .iter()
        .any(|a| last == *a || op.ends_with(a))
}

/// Resource-management family: resource groups, virtual machines,
/// operation status and the operations catalogue.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResourceManagerMapper;

impl ResourceManagerMapper {
    fn resource_groups(
        req: &MapRequest<'_>,
        data: &dyn DataAccess,
    ) -> Result<Option<Value>, MapError> {
        let rg_name = req.param("resourceGroupName");
        match req.method.as_str() {
            "GET" | "HEAD" => match rg_name {
                Some(name) => data
                    .resource_groups()
                    .into_iter()
                    .find(|rg| rg.name == name)
                    .map(|rg| Some(group_payload(rg)))
                    .ok_or_else(|| MapError::not_found("resource group", name)),
                None => {
                    let value: Vec<Value> =
                        data.resource_groups().into_iter().map(group_payload).collect();
                    Ok(Some(json!({ "value": value })))
                }
            },
            "PUT" | "POST" | "PATCH" => {
                let name = rg_name.unwrap_or_default();
                Ok(Some(json!({
                    "id": format!(
                        "/subscriptions/{}/resourceGroups/{}",
                        req.param("subscriptionId").unwrap_or_default(),
                        name
                    ),
                    "name": name,
                    "location": req.param("location").unwrap_or_default(),
                })))
            }
            "DELETE" => Ok(None),
            other => Err(MapError::UnsupportedMethod(other.to_string())),
        }
    }

    fn virtual_machines(
        req: &MapRequest<'_>,
        data: &dyn DataAccess,
    ) -> Result<Option<Value>, MapError> {
        let vm_name = req.param("vmName");
        let rg_name = req.param("resourceGroupName");
        let in_group = |vm: &VirtualMachine| rg_name.map_or(true, |rg| vm.resource_group == rg);
        let find = |name: &str| {
            data.virtual_machines()
                .into_iter()
                .find(|vm| vm.name == name && in_group(*vm))
                .ok_or_else(|| MapError::not_found("virtual machine", name))
        };

        match req.method.as_str() {
            "GET" | "HEAD" => {
                let expand = req
                    .param("$expand")
                    .is_some_and(|e| e.eq_ignore_ascii_case("instanceView"));
                match vm_name {
                    Some(name) => vm_payload(find(name)?, expand).map(Some),
                    None => {
                        let value = data
                            .virtual_machines()
                            .into_iter()
                            .filter(|vm| in_group(*vm))
                            .map(|vm| vm_payload(vm, expand))
                            .collect::<Result<Vec<_>, _>>()?;
                        Ok(Some(json!({ "value": value })))
                    }
                }
            }
            "POST" if is_power_action(req) => {
                if let Some(name) = vm_name {
                    find(name)?;
                }
                Ok(Some(json!({ "status": "Succeeded" })))
            }
            "POST" | "PUT" | "PATCH" => {
                let name = vm_name.unwrap_or_default();
                Ok(Some(json!({
                    "id": format!(
                        "/subscriptions/{}/resourceGroups/{}/providers/{}/{}",
                        req.param("subscriptionId").unwrap_or_default(),
                        rg_name.unwrap_or_default(),
                        VM_TYPE,
                        name
                    ),
                    "name": name,
                    "type": VM_TYPE,
                    "location": req.param("location").unwrap_or_default(),
                    "status": "Succeeded",
                })))
            }
            "DELETE" => {
                if let Some(name) = vm_name {
                    find(name)?;
                }
                Ok(None)
            }
            other => Err(MapError::UnsupportedMethod(other.to_string())),
        }
    }

    fn operations_catalogue() -> Value {
        json!({
            "value": [
                { "name": "Microsoft.Resources/ResourceGroups/read" },
                { "name": "Microsoft.Resources/ResourceGroups/write" },
                { "name": "Microsoft.Compute/virtualMachines/read" },
                { "name": "Microsoft.Compute/virtualMachines/write" },
            ]
        })
    }
}

impl FamilyResponseMapper for ResourceManagerMapper {
    fn family(&self) -> Family {
        Family::ResourceManagement
    }

    fn map(&self, req: &MapRequest<'_>, data: &dyn DataAccess) -> Result<Option<Value>, MapError> {
        match classify(req.path_pattern, req.method) {
            ResourceKind::OperationStatus => Ok(Some(operation_status(req))),
            ResourceKind::VirtualMachines => Self::virtual_machines(req, data),
            ResourceKind::ResourceGroups => Self::resource_groups(req, data),
            ResourceKind::OperationsCatalogue => Ok(Some(Self::operations_catalogue())),
            ResourceKind::Other => Ok(Some(json!({ "value": [] }))),
        }
    }
}
