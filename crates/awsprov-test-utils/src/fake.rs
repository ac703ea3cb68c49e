//! In-memory fake of the EC2 and IAM calls the utilities make
//!
//! [`FakeCloud`] implements every capability trait of `awsprov::aws`. It
//! keeps just enough state to enforce the dependency rules a real account
//! has (a VPC cannot be deleted while a subnet, an attached gateway or an
//! endpoint remains) and records every call so tests can assert ordering.

use anyhow::{bail, Result};
use awsprov::aws::ec2::IngressRule;
use awsprov::aws::{
    IamOperations, InstanceOperations, InstanceProfileSummary, LaunchInstanceConfig,
    LaunchedInstance, SecurityGroupOperations, SecurityGroupSummary, VpcOperations,
};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeVpc {
    pub name: String,
    pub cidr_block: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeSubnet {
    pub vpc_id: String,
    pub name: String,
    pub availability_zone: String,
    pub cidr_block: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeGateway {
    pub name: String,
    pub attached_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeRouteTable {
    pub vpc_id: String,
    pub name: Option<String>,
    /// (destination CIDR, gateway ID)
    pub routes: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeEndpoint {
    pub vpc_id: String,
    pub route_table_id: String,
    pub service_name: String,
    pub policy_document: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeInstance {
    pub config: LaunchInstanceConfig,
    pub describes: u32,
    pub terminated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeRole {
    pub assume_role_policy: String,
    pub description: String,
    pub managed_policies: Vec<String>,
    pub inline_policies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeProfile {
    pub arn: String,
    pub roles: Vec<String>,
}

/// Everything the fake account holds, keyed by resource ID (or by name for
/// IAM)
#[derive(Debug, Clone, Default)]
pub struct FakeState {
    pub vpcs: BTreeMap<String, FakeVpc>,
    pub subnets: BTreeMap<String, FakeSubnet>,
    pub gateways: BTreeMap<String, FakeGateway>,
    pub route_tables: BTreeMap<String, FakeRouteTable>,
    pub endpoints: BTreeMap<String, FakeEndpoint>,
    pub instances: BTreeMap<String, FakeInstance>,
    pub security_groups: BTreeMap<String, SecurityGroupSummary>,
    pub roles: BTreeMap<String, FakeRole>,
    pub profiles: BTreeMap<String, FakeProfile>,
    pub default_vpc: Option<String>,
    /// Latest AL2023 image the fake reports
    pub latest_ami: String,
    /// Number of describes after which an instance gets a public IP;
    /// `None` never assigns one
    pub public_ip_after: Option<u32>,
    /// Operation names that fail when called
    pub failing: Vec<String>,
    /// Every call, as "operation arg arg..."
    pub calls: Vec<String>,
    next_id: u32,
}

/// In-memory EC2 and IAM account
#[derive(Debug)]
pub struct FakeCloud {
    state: Mutex<FakeState>,
}

impl Default for FakeCloud {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeCloud {
    /// An empty account whose instances get a public IP on the first describe
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                latest_ami: "ami-al2023-latest".to_string(),
                public_ip_after: Some(0),
                ..Default::default()
            }),
        }
    }

    /// Give the account a default VPC
    pub fn with_default_vpc(self, vpc_id: &str) -> Self {
        self.lock().default_vpc = Some(vpc_id.to_string());
        self
    }

    /// Let instances get a public IP only after `describes` describe calls
    pub fn with_public_ip_after(self, describes: Option<u32>) -> Self {
        self.lock().public_ip_after = describes;
        self
    }

    /// Make `operation` fail every time it is called
    pub fn failing(self, operation: &str) -> Self {
        self.lock().failing.push(operation.to_string());
        self
    }

    /// A copy of the current state
    pub fn snapshot(&self) -> FakeState {
        self.lock().clone()
    }

    /// Every call made so far
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Just the operation names of every call made so far
    pub fn operations(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|c| c.split(' ').next().unwrap_or_default().to_string())
            .collect()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Record a call and lock the state for it
    fn call(&self, operation: &str, args: &[&str]) -> Result<MutexGuard<'_, FakeState>> {
        let mut state = self.lock();
        let mut entry = operation.to_string();
        for arg in args {
            entry.push(' ');
            entry.push_str(arg);
        }
        state.calls.push(entry);
        if state.failing.iter().any(|op| op == operation) {
            bail!("{} failed (injected)", operation);
        }
        Ok(state)
    }
}

impl FakeState {
    fn new_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{:04}", prefix, self.next_id)
    }
}

impl VpcOperations for FakeCloud {
    async fn find_vpcs(&self, name: &str) -> Result<Vec<String>> {
        let state = self.call("find_vpcs", &[name])?;
        Ok(state
            .vpcs
            .iter()
            .filter(|(_, v)| v.name == name)
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn create_vpc(&self, cidr_block: &str, name: &str) -> Result<String> {
        let mut state = self.call("create_vpc", &[cidr_block, name])?;
        let vpc_id = state.new_id("vpc");
        state.vpcs.insert(
            vpc_id.clone(),
            FakeVpc {
                name: name.to_string(),
                cidr_block: cidr_block.to_string(),
            },
        );
        // The main route table comes with the VPC
        let rtb_id = state.new_id("rtb");
        state.route_tables.insert(
            rtb_id,
            FakeRouteTable {
                vpc_id: vpc_id.clone(),
                name: None,
                routes: Vec::new(),
            },
        );
        Ok(vpc_id)
    }

    async fn create_subnet(
        &self,
        vpc_id: &str,
        availability_zone: &str,
        cidr_block: &str,
        name: &str,
    ) -> Result<String> {
        let mut state = self.call("create_subnet", &[vpc_id, availability_zone, cidr_block, name])?;
        if !state.vpcs.contains_key(vpc_id) {
            bail!("InvalidVpcID.NotFound: {}", vpc_id);
        }
        let subnet_id = state.new_id("subnet");
        state.subnets.insert(
            subnet_id.clone(),
            FakeSubnet {
                vpc_id: vpc_id.to_string(),
                name: name.to_string(),
                availability_zone: availability_zone.to_string(),
                cidr_block: cidr_block.to_string(),
            },
        );
        Ok(subnet_id)
    }

    async fn create_internet_gateway(&self, name: &str) -> Result<String> {
        let mut state = self.call("create_internet_gateway", &[name])?;
        let gateway_id = state.new_id("igw");
        state.gateways.insert(
            gateway_id.clone(),
            FakeGateway {
                name: name.to_string(),
                attached_to: None,
            },
        );
        Ok(gateway_id)
    }

    async fn attach_internet_gateway(&self, gateway_id: &str, vpc_id: &str) -> Result<()> {
        let mut state = self.call("attach_internet_gateway", &[gateway_id, vpc_id])?;
        if !state.vpcs.contains_key(vpc_id) {
            bail!("InvalidVpcID.NotFound: {}", vpc_id);
        }
        match state.gateways.get_mut(gateway_id) {
            Some(gw) if gw.attached_to.is_some() => bail!("Resource.AlreadyAssociated: {}", gateway_id),
            Some(gw) => {
                gw.attached_to = Some(vpc_id.to_string());
                Ok(())
            }
            None => bail!("InvalidInternetGatewayID.NotFound: {}", gateway_id),
        }
    }

    async fn find_route_tables(&self, vpc_id: &str) -> Result<Vec<String>> {
        let state = self.call("find_route_tables", &[vpc_id])?;
        Ok(state
            .route_tables
            .iter()
            .filter(|(_, rt)| rt.vpc_id == vpc_id)
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn tag_resource(&self, resource_id: &str, name: &str) -> Result<()> {
        let mut state = self.call("tag_resource", &[resource_id, name])?;
        match state.route_tables.get_mut(resource_id) {
            Some(rt) => {
                rt.name = Some(name.to_string());
                Ok(())
            }
            None => bail!("InvalidID: {} cannot be tagged by the fake", resource_id),
        }
    }

    async fn create_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        gateway_id: &str,
    ) -> Result<()> {
        let mut state = self.call("create_route", &[route_table_id, destination_cidr, gateway_id])?;
        if !state.gateways.contains_key(gateway_id) {
            bail!("InvalidInternetGatewayID.NotFound: {}", gateway_id);
        }
        match state.route_tables.get_mut(route_table_id) {
            Some(rt) if rt.routes.iter().any(|(dst, _)| dst == destination_cidr) => {
                bail!("RouteAlreadyExists: {}", destination_cidr)
            }
            Some(rt) => {
                rt.routes
                    .push((destination_cidr.to_string(), gateway_id.to_string()));
                Ok(())
            }
            None => bail!("InvalidRouteTableID.NotFound: {}", route_table_id),
        }
    }

    async fn create_vpc_endpoint(
        &self,
        vpc_id: &str,
        route_table_id: &str,
        service_name: &str,
        policy_document: &str,
    ) -> Result<String> {
        let mut state = self.call("create_vpc_endpoint", &[vpc_id, route_table_id, service_name])?;
        if !state.vpcs.contains_key(vpc_id) {
            bail!("InvalidVpcID.NotFound: {}", vpc_id);
        }
        let endpoint_id = state.new_id("vpce");
        state.endpoints.insert(
            endpoint_id.clone(),
            FakeEndpoint {
                vpc_id: vpc_id.to_string(),
                route_table_id: route_table_id.to_string(),
                service_name: service_name.to_string(),
                policy_document: policy_document.to_string(),
            },
        );
        Ok(endpoint_id)
    }

    async fn find_internet_gateways(&self, vpc_id: &str, name: &str) -> Result<Vec<String>> {
        let state = self.call("find_internet_gateways", &[vpc_id, name])?;
        Ok(state
            .gateways
            .iter()
            .filter(|(_, gw)| gw.name == name && gw.attached_to.as_deref() == Some(vpc_id))
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn find_detached_internet_gateways(&self, name: &str) -> Result<Vec<String>> {
        let state = self.call("find_detached_internet_gateways", &[name])?;
        Ok(state
            .gateways
            .iter()
            .filter(|(_, gw)| gw.name == name && gw.attached_to.is_none())
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn detach_internet_gateway(&self, gateway_id: &str, vpc_id: &str) -> Result<()> {
        let mut state = self.call("detach_internet_gateway", &[gateway_id, vpc_id])?;
        match state.gateways.get_mut(gateway_id) {
            Some(gw) if gw.attached_to.as_deref() == Some(vpc_id) => {
                gw.attached_to = None;
                Ok(())
            }
            Some(_) => bail!("Gateway.NotAttached: {} is not attached to {}", gateway_id, vpc_id),
            None => bail!("InvalidInternetGatewayID.NotFound: {}", gateway_id),
        }
    }

    async fn delete_internet_gateway(&self, gateway_id: &str) -> Result<()> {
        let mut state = self.call("delete_internet_gateway", &[gateway_id])?;
        if let Some(gw) = state.gateways.get(gateway_id) {
            if gw.attached_to.is_some() {
                bail!("DependencyViolation: {} is still attached", gateway_id);
            }
        }
        state.gateways.remove(gateway_id);
        Ok(())
    }

    async fn find_subnets(&self, vpc_id: &str, name: &str) -> Result<Vec<String>> {
        let state = self.call("find_subnets", &[vpc_id, name])?;
        Ok(state
            .subnets
            .iter()
            .filter(|(_, s)| s.vpc_id == vpc_id && s.name == name)
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn delete_subnet(&self, subnet_id: &str) -> Result<()> {
        let mut state = self.call("delete_subnet", &[subnet_id])?;
        state.subnets.remove(subnet_id);
        Ok(())
    }

    async fn find_vpc_endpoints(&self, vpc_id: &str) -> Result<Vec<String>> {
        let state = self.call("find_vpc_endpoints", &[vpc_id])?;
        Ok(state
            .endpoints
            .iter()
            .filter(|(_, e)| e.vpc_id == vpc_id)
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn delete_vpc_endpoints(&self, endpoint_ids: Vec<String>) -> Result<()> {
        let args: Vec<&str> = endpoint_ids.iter().map(String::as_str).collect();
        let mut state = self.call("delete_vpc_endpoints", &args)?;
        for id in &endpoint_ids {
            if state.endpoints.remove(id).is_none() {
                bail!("InvalidVpcEndpointId.NotFound: {}", id);
            }
        }
        Ok(())
    }

    async fn delete_vpc(&self, vpc_id: &str) -> Result<()> {
        let mut state = self.call("delete_vpc", &[vpc_id])?;
        if !state.vpcs.contains_key(vpc_id) {
            bail!("InvalidVpcID.NotFound: {}", vpc_id);
        }
        let in_use = state.subnets.values().any(|s| s.vpc_id == vpc_id)
            || state
                .gateways
                .values()
                .any(|gw| gw.attached_to.as_deref() == Some(vpc_id))
            || state.endpoints.values().any(|e| e.vpc_id == vpc_id);
        if in_use {
            bail!("DependencyViolation: {} has dependencies and cannot be deleted", vpc_id);
        }
        state.vpcs.remove(vpc_id);
        state.route_tables.retain(|_, rt| rt.vpc_id != vpc_id);
        Ok(())
    }

    async fn default_vpc_id(&self) -> Result<Option<String>> {
        let state = self.call("default_vpc_id", &[])?;
        Ok(state.default_vpc.clone())
    }
}

impl InstanceOperations for FakeCloud {
    async fn latest_al2023_ami(&self) -> Result<String> {
        let state = self.call("latest_al2023_ami", &[])?;
        Ok(state.latest_ami.clone())
    }

    async fn launch_instance(&self, config: LaunchInstanceConfig) -> Result<LaunchedInstance> {
        let mut state = self.call(
            "launch_instance",
            &[
                config.image_id.as_str(),
                config.security_group.as_str(),
                config.key_name.as_str(),
            ],
        )?;
        let known_group = state
            .security_groups
            .values()
            .any(|g| g.group_name == config.security_group);
        if !known_group {
            bail!("InvalidGroup.NotFound: {}", config.security_group);
        }
        let instance_id = state.new_id("i");
        let launched = LaunchedInstance {
            instance_id: instance_id.clone(),
            instance_type: config.instance_type.clone(),
            key_name: Some(config.key_name.clone()),
            public_ip: None,
        };
        state.instances.insert(
            instance_id,
            FakeInstance {
                config,
                describes: 0,
                terminated: false,
            },
        );
        Ok(launched)
    }

    async fn describe_instance(&self, instance_id: &str) -> Result<LaunchedInstance> {
        let mut state = self.call("describe_instance", &[instance_id])?;
        let ip_after = state.public_ip_after;
        let Some(instance) = state.instances.get_mut(instance_id) else {
            bail!("InvalidInstanceID.NotFound: {}", instance_id);
        };
        instance.describes += 1;
        let has_ip = !instance.terminated
            && ip_after.is_some_and(|after| instance.describes > after);
        Ok(LaunchedInstance {
            instance_id: instance_id.to_string(),
            instance_type: instance.config.instance_type.clone(),
            key_name: Some(instance.config.key_name.clone()),
            public_ip: has_ip.then(|| "203.0.113.10".to_string()),
        })
    }

    async fn terminate_instance(&self, instance_id: &str) -> Result<()> {
        let mut state = self.call("terminate_instance", &[instance_id])?;
        match state.instances.get_mut(instance_id) {
            Some(instance) => {
                instance.terminated = true;
                Ok(())
            }
            None => bail!("InvalidInstanceID.NotFound: {}", instance_id),
        }
    }
}

impl SecurityGroupOperations for FakeCloud {
    async fn find_security_groups(&self, name: &str) -> Result<Vec<String>> {
        let state = self.call("find_security_groups", &[name])?;
        Ok(state
            .security_groups
            .iter()
            .filter(|(_, g)| g.group_name == name)
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn create_security_group(&self, name: &str, description: &str) -> Result<String> {
        let mut state = self.call("create_security_group", &[name])?;
        if state.security_groups.values().any(|g| g.group_name == name) {
            bail!("InvalidGroup.Duplicate: {} already exists", name);
        }
        let group_id = state.new_id("sg");
        let vpc_id = state.default_vpc.clone();
        state.security_groups.insert(
            group_id.clone(),
            SecurityGroupSummary {
                group_id: group_id.clone(),
                group_name: name.to_string(),
                description: description.to_string(),
                vpc_id,
                ingress: Vec::new(),
            },
        );
        Ok(group_id)
    }

    async fn authorize_tcp_ingress(&self, group_id: &str, port: i32, cidr_ip: &str) -> Result<()> {
        let port_text = port.to_string();
        let mut state = self.call("authorize_tcp_ingress", &[group_id, &port_text, cidr_ip])?;
        let Some(group) = state.security_groups.get_mut(group_id) else {
            bail!("InvalidGroup.NotFound: {}", group_id);
        };
        group.ingress.push(IngressRule {
            protocol: "tcp".to_string(),
            from_port: Some(port),
            to_port: Some(port),
            cidr_blocks: vec![cidr_ip.to_string()],
        });
        Ok(())
    }

    async fn describe_security_group(&self, group_id: &str) -> Result<SecurityGroupSummary> {
        let state = self.call("describe_security_group", &[group_id])?;
        match state.security_groups.get(group_id) {
            Some(group) => Ok(group.clone()),
            None => bail!("InvalidGroup.NotFound: {}", group_id),
        }
    }

    async fn delete_security_group(&self, group_id: &str) -> Result<()> {
        let mut state = self.call("delete_security_group", &[group_id])?;
        state.security_groups.remove(group_id);
        Ok(())
    }
}

impl IamOperations for FakeCloud {
    async fn find_instance_profile(&self, name: &str) -> Result<Option<InstanceProfileSummary>> {
        let state = self.call("find_instance_profile", &[name])?;
        Ok(state.profiles.get(name).map(|p| InstanceProfileSummary {
            name: name.to_string(),
            arn: p.arn.clone(),
            roles: p.roles.clone(),
        }))
    }

    async fn role_exists(&self, role_name: &str) -> Result<bool> {
        let state = self.call("role_exists", &[role_name])?;
        Ok(state.roles.contains_key(role_name))
    }

    async fn create_role(
        &self,
        role_name: &str,
        assume_role_policy: &str,
        description: &str,
    ) -> Result<String> {
        let mut state = self.call("create_role", &[role_name])?;
        if state.roles.contains_key(role_name) {
            bail!("EntityAlreadyExists: role {} already exists", role_name);
        }
        state.roles.insert(
            role_name.to_string(),
            FakeRole {
                assume_role_policy: assume_role_policy.to_string(),
                description: description.to_string(),
                managed_policies: Vec::new(),
                inline_policies: Vec::new(),
            },
        );
        Ok(format!("arn:aws:iam::123456789012:role/{}", role_name))
    }

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()> {
        let mut state = self.call("attach_role_policy", &[role_name, policy_arn])?;
        let Some(role) = state.roles.get_mut(role_name) else {
            bail!("NoSuchEntity: role {}", role_name);
        };
        if !role.managed_policies.iter().any(|p| p == policy_arn) {
            role.managed_policies.push(policy_arn.to_string());
        }
        Ok(())
    }

    async fn list_attached_role_policies(&self, role_name: &str) -> Result<Vec<String>> {
        let state = self.call("list_attached_role_policies", &[role_name])?;
        Ok(state
            .roles
            .get(role_name)
            .map(|r| r.managed_policies.clone())
            .unwrap_or_default())
    }

    async fn detach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()> {
        let mut state = self.call("detach_role_policy", &[role_name, policy_arn])?;
        if let Some(role) = state.roles.get_mut(role_name) {
            role.managed_policies.retain(|p| p != policy_arn);
        }
        Ok(())
    }

    async fn list_role_policies(&self, role_name: &str) -> Result<Vec<String>> {
        let state = self.call("list_role_policies", &[role_name])?;
        Ok(state
            .roles
            .get(role_name)
            .map(|r| r.inline_policies.clone())
            .unwrap_or_default())
    }

    async fn delete_role_policy(&self, role_name: &str, policy_name: &str) -> Result<()> {
        let mut state = self.call("delete_role_policy", &[role_name, policy_name])?;
        if let Some(role) = state.roles.get_mut(role_name) {
            role.inline_policies.retain(|p| p != policy_name);
        }
        Ok(())
    }

    async fn create_instance_profile(&self, name: &str) -> Result<String> {
        let mut state = self.call("create_instance_profile", &[name])?;
        if state.profiles.contains_key(name) {
            bail!("EntityAlreadyExists: instance profile {} already exists", name);
        }
        let arn = format!("arn:aws:iam::123456789012:instance-profile/{}", name);
        state.profiles.insert(
            name.to_string(),
            FakeProfile {
                arn: arn.clone(),
                roles: Vec::new(),
            },
        );
        Ok(arn)
    }

    async fn add_role_to_instance_profile(&self, profile_name: &str, role_name: &str) -> Result<()> {
        let mut state = self.call("add_role_to_instance_profile", &[profile_name, role_name])?;
        if !state.roles.contains_key(role_name) {
            bail!("NoSuchEntity: role {}", role_name);
        }
        let Some(profile) = state.profiles.get_mut(profile_name) else {
            bail!("NoSuchEntity: instance profile {}", profile_name);
        };
        if !profile.roles.is_empty() {
            bail!("LimitExceeded: instance profile {} already has a role", profile_name);
        }
        profile.roles.push(role_name.to_string());
        Ok(())
    }

    async fn remove_role_from_instance_profile(
        &self,
        profile_name: &str,
        role_name: &str,
    ) -> Result<()> {
        let mut state = self.call("remove_role_from_instance_profile", &[profile_name, role_name])?;
        if let Some(profile) = state.profiles.get_mut(profile_name) {
            profile.roles.retain(|r| r != role_name);
        }
        Ok(())
    }

    async fn delete_instance_profile(&self, name: &str) -> Result<()> {
        let mut state = self.call("delete_instance_profile", &[name])?;
        if let Some(profile) = state.profiles.get(name) {
            if !profile.roles.is_empty() {
                bail!("DeleteConflict: instance profile {} still has roles", name);
            }
        }
        state.profiles.remove(name);
        Ok(())
    }

    async fn delete_role(&self, role_name: &str) -> Result<()> {
        let mut state = self.call("delete_role", &[role_name])?;
        if let Some(role) = state.roles.get(role_name) {
            if !role.managed_policies.is_empty() || !role.inline_policies.is_empty() {
                bail!("DeleteConflict: role {} still has policies", role_name);
            }
        }
        let in_profile = state
            .profiles
            .values()
            .any(|p| p.roles.iter().any(|r| r == role_name));
        if in_profile {
            bail!("DeleteConflict: role {} is in an instance profile", role_name);
        }
        state.roles.remove(role_name);
        Ok(())
    }
}

impl FakeCloud {
    /// Add an inline policy to an existing role, as a console user might
    pub fn put_inline_policy(&self, role_name: &str, policy_name: &str) {
        if let Some(role) = self.lock().roles.get_mut(role_name) {
            role.inline_policies.push(policy_name.to_string());
        }
    }
}
