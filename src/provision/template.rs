//! Template synthesis.
//!
//! # Responsibilities
//! - Implement `Provisioner` by rendering resources into a template
//! - Derive deterministic logical ids from resource paths
//! - Map grant levels to storage action sets
//!
//! # Design Decisions
//! - No I/O: the caller decides where the rendered JSON goes
//! - Resources are keyed in a BTreeMap so output is byte-stable
//! - Logical id = PascalCase path + first 8 hex digits of its SHA-256
//! - Paths are namespaced (`bucket`, `handlers`, `api`, `api/<id>/segments`)
//! - A repeated logical id is rejected, never overwritten

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::config::schema::{Encryption, RemovalPolicy};
use crate::error::ProvisionError;
use crate::grants::{GrantLevel, GrantRequirement};
use crate::integration::{Integration, IntegrationMode, MethodResponse};
use crate::provision::{BucketId, BucketSpec, HandlerId, HandlerRef, Provisioner};
use crate::routing::{MethodBinding, RouteBinding, RoutingSurface};

const POLICY_VERSION: &str = "2012-10-17";

const READ_ACTIONS: [&str; 3] = ["s3:GetObject*", "s3:GetBucket*", "s3:List*"];
const WRITE_ACTIONS: [&str; 7] = [
    "s3:DeleteObject*",
    "s3:PutObject",
    "s3:PutObjectLegalHold",
    "s3:PutObjectRetention",
    "s3:PutObjectTagging",
    "s3:PutObjectVersionTagging",
    "s3:Abort*",
];

/// Storage actions granted for a level.
pub fn s3_actions(level: GrantLevel) -> Vec<&'static str> {
    match level {
        GrantLevel::None => Vec::new(),
        GrantLevel::Read => READ_ACTIONS.to_vec(),
        GrantLevel::ReadWrite => READ_ACTIONS.iter().chain(WRITE_ACTIONS.iter()).copied().collect(),
    }
}

/// Deterministic logical id for a resource path.
pub fn logical_id(path: &[&str]) -> String {
    let mut readable = String::new();
    for part in path {
        for word in part.split(|c: char| !c.is_ascii_alphanumeric()) {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                readable.push(first.to_ascii_uppercase());
                readable.extend(chars);
            }
        }
    }
    let digest = Sha256::digest(path.join("/").as_bytes());
    let hash = format!("{digest:X}");
    format!("{readable}{}", &hash[..8])
}

/// A rendered deployment template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Template {
    pub resources: BTreeMap<String, Value>,
    pub outputs: BTreeMap<String, Value>,
}

impl Template {
    /// All resources of a given type, as (logical id, resource) pairs.
    pub fn resources_of_type(&self, resource_type: &str) -> Vec<(&str, &Value)> {
        self.resources
            .iter()
            .filter(|(_, r)| r["Type"] == resource_type)
            .map(|(id, r)| (id.as_str(), r))
            .collect()
    }

    pub fn to_json(&self) -> Value {
        json!({
            "Resources": self.resources,
            "Outputs": self.outputs,
        })
    }

    pub fn to_string_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_json())
    }
}

#[derive(Debug, Clone)]
struct HandlerResources {
    function: String,
    role: String,
}

/// Provisioner that renders every call into a [`Template`].
#[derive(Debug)]
pub struct TemplateSynthesizer {
    stack: String,
    stage: String,
    template: Template,
    /// Bucket spec id → logical id.
    buckets: BTreeMap<String, String>,
    handlers: BTreeMap<String, HandlerResources>,
}

impl TemplateSynthesizer {
    pub fn new(stack: impl Into<String>, stage: impl Into<String>) -> Self {
        Self {
            stack: stack.into(),
            stage: stage.into(),
            template: Template::default(),
            buckets: BTreeMap::new(),
            handlers: BTreeMap::new(),
        }
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn into_template(self) -> Template {
        self.template
    }

    /// Add one resource. An id already in the template is a collision, never an overwrite.
    fn insert(&mut self, id: &str, resource: Value) -> Result<(), ProvisionError> {
        if self.template.resources.contains_key(id) {
            return Err(ProvisionError::Rejected(format!("logical id {id} already in template")));
        }
        tracing::trace!(logical_id = %id, resource_type = %resource["Type"], "Resource rendered");
        self.template.resources.insert(id.to_string(), resource);
        Ok(())
    }

    /// Add a batch of resources, all or nothing.
    fn insert_all(&mut self, rendered: Vec<(String, Value)>) -> Result<(), ProvisionError> {
        let mut seen = BTreeSet::new();
        for (id, _) in &rendered {
            if self.template.resources.contains_key(id) || !seen.insert(id.as_str()) {
                return Err(ProvisionError::Rejected(format!("logical id {id} already in template")));
            }
        }
        for (id, resource) in rendered {
            self.insert(&id, resource)?;
        }
        Ok(())
    }

    fn bucket_logical_id(&self, bucket: &BucketId) -> Result<String, ProvisionError> {
        if self.buckets.values().any(|id| *id == bucket.0) {
            Ok(bucket.0.clone())
        } else {
            Err(ProvisionError::UnknownBucket(bucket.0.clone()))
        }
    }

    fn handler(&self, name: &str) -> Result<&HandlerResources, ProvisionError> {
        self.handlers
            .get(name)
            .ok_or_else(|| ProvisionError::UnknownHandler(name.to_string()))
    }

    fn render_method(
        &self,
        api: &str,
        resource: &str,
        binding: &RouteBinding,
        method: &MethodBinding,
    ) -> Result<Value, ProvisionError> {
        let function = &self.handler(&method.handler.name)?.function;
        let mut integration = json!({
            "IntegrationHttpMethod": "POST",
            "Type": "AWS_PROXY",
            "Uri": invocation_uri(function),
        });
        render_integration_extras(&mut integration, &method.integration.integration);

        let mut properties = json!({
            "HttpMethod": method.method.as_str(),
            "ResourceId": { "Ref": resource },
            "RestApiId": { "Ref": api },
            "AuthorizationType": "NONE",
            "Integration": integration,
        });
        if !method.integration.method_responses.is_empty() {
            properties["MethodResponses"] = method
                .integration
                .method_responses
                .iter()
                .map(render_method_response)
                .collect();
        }

        tracing::trace!(path = %binding.path, method = %method.method, "Method rendered");
        Ok(json!({ "Type": "AWS::ApiGateway::Method", "Properties": properties }))
    }
}

impl Provisioner for TemplateSynthesizer {
    fn provision_bucket(&mut self, spec: &BucketSpec) -> Result<BucketId, ProvisionError> {
        let id = logical_id(&[&self.stack, "bucket", &spec.id]);
        let policy = spec.policy;

        let mut properties = serde_json::Map::new();
        if let Some(name) = &spec.bucket_name {
            properties.insert("BucketName".into(), json!(name));
        }
        let algorithm = match policy.encryption {
            Encryption::S3Managed => "AES256",
            Encryption::KmsManaged => "aws:kms",
        };
        properties.insert(
            "BucketEncryption".into(),
            json!({
                "ServerSideEncryptionConfiguration": [
                    { "ServerSideEncryptionByDefault": { "SSEAlgorithm": algorithm } }
                ]
            }),
        );
        if policy.block_public_access {
            properties.insert(
                "PublicAccessBlockConfiguration".into(),
                json!({
                    "BlockPublicAcls": true,
                    "BlockPublicPolicy": true,
                    "IgnorePublicAcls": true,
                    "RestrictPublicBuckets": true,
                }),
            );
        }
        if policy.versioned {
            properties.insert("VersioningConfiguration".into(), json!({ "Status": "Enabled" }));
        }

        let removal = match policy.removal {
            RemovalPolicy::Destroy => "Delete",
            RemovalPolicy::Retain => "Retain",
        };
        self.insert(
            &id,
            json!({
                "Type": "AWS::S3::Bucket",
                "Properties": properties,
                "UpdateReplacePolicy": removal,
                "DeletionPolicy": removal,
            }),
        )?;

        if policy.enforce_ssl {
            let policy_id = logical_id(&[&self.stack, "bucket", &spec.id, "Policy"]);
            self.insert(
                &policy_id,
                json!({
                    "Type": "AWS::S3::BucketPolicy",
                    "Properties": {
                        "Bucket": { "Ref": id },
                        "PolicyDocument": {
                            "Statement": [{
                                "Action": "s3:*",
                                "Condition": { "Bool": { "aws:SecureTransport": "false" } },
                                "Effect": "Deny",
                                "Principal": { "AWS": "*" },
                                "Resource": bucket_arns(&id),
                            }],
                            "Version": POLICY_VERSION,
                        },
                    },
                }),
            )?;
        }

        tracing::info!(bucket = %spec.id, logical_id = %id, "Bucket provisioned");
        self.buckets.insert(spec.id.clone(), id.clone());
        Ok(BucketId(id))
    }

    fn provision_handler(&mut self, handler: &HandlerRef, bucket: &BucketId) -> Result<HandlerId, ProvisionError> {
        let bucket_id = self.bucket_logical_id(bucket)?;
        let role = logical_id(&[&self.stack, "handlers", &handler.name, "ServiceRole"]);
        let function = logical_id(&[&self.stack, "handlers", &handler.name]);

        self.insert(
            &role,
            json!({
                "Type": "AWS::IAM::Role",
                "Properties": {
                    "AssumeRolePolicyDocument": {
                        "Statement": [{
                            "Action": "sts:AssumeRole",
                            "Effect": "Allow",
                            "Principal": { "Service": "lambda.amazonaws.com" },
                        }],
                        "Version": POLICY_VERSION,
                    },
                    "ManagedPolicyArns": [{
                        "Fn::Join": ["", [
                            "arn:", { "Ref": "AWS::Partition" },
                            ":iam::aws:policy/service-role/AWSLambdaBasicExecutionRole",
                        ]]
                    }],
                },
            }),
        )?;

        let mut variables: serde_json::Map<String, Value> = handler
            .environment
            .iter()
            .map(|(k, v)| (k.clone(), json!(v)))
            .collect();
        if let Some(key) = &handler.bucket_env {
            variables.insert(key.clone(), json!({ "Ref": bucket_id }));
        }

        let mut properties = json!({
            "FunctionName": handler.name,
            "Handler": "bootstrap",
            "Runtime": handler.runtime,
            "Architectures": [handler.architecture.as_str()],
            "Timeout": handler.timeout.as_secs(),
            "Role": { "Fn::GetAtt": [role, "Arn"] },
        });
        if let Some(description) = &handler.description {
            properties["Description"] = json!(description);
        }
        if !variables.is_empty() {
            properties["Environment"] = json!({ "Variables": variables });
        }
        if handler.tracing {
            properties["TracingConfig"] = json!({ "Mode": "Active" });
        }

        let mut resource = json!({
            "Type": "AWS::Lambda::Function",
            "Properties": properties,
            "DependsOn": [role],
        });
        if let Some(asset) = &handler.code_asset {
            resource["Metadata"] = json!({ "asset:path": asset });
        }
        self.insert(&function, resource)?;

        tracing::info!(handler = %handler.name, logical_id = %function, "Handler provisioned");
        self.handlers.insert(
            handler.name.clone(),
            HandlerResources {
                function: function.clone(),
                role,
            },
        );
        Ok(HandlerId(function))
    }

    fn provision_surface(&mut self, surface: &RoutingSurface) -> Result<(), ProvisionError> {
        // Route segments live under "segments" so no route name can shadow a fixed resource.
        let api = logical_id(&[&self.stack, "api", &surface.id]);
        let stage = logical_id(&[&self.stack, "api", &surface.id, "DeploymentStage", &self.stage]);
        let deployment = logical_id(&[&self.stack, "api", &surface.id, "Deployment"]);
        let segment_id = |parts: &[&str]| {
            let mut path = vec![self.stack.as_str(), "api", surface.id.as_str(), "segments"];
            path.extend_from_slice(parts);
            logical_id(&path)
        };

        // Render everything first so an unknown handler leaves the template untouched.
        let mut rendered = vec![(
            api.clone(),
            json!({ "Type": "AWS::ApiGateway::RestApi", "Properties": { "Name": surface.id } }),
        )];
        let mut method_ids = Vec::new();

        for binding in &surface.bindings {
            let resource = segment_id(&[binding.path_part.as_str()]);
            rendered.push((
                resource.clone(),
                json!({
                    "Type": "AWS::ApiGateway::Resource",
                    "Properties": {
                        "ParentId": { "Fn::GetAtt": [api, "RootResourceId"] },
                        "PathPart": binding.path_part,
                        "RestApiId": { "Ref": api },
                    },
                }),
            ));

            for method in &binding.methods {
                let verb = method.method.as_str();
                let method_id = segment_id(&[binding.path_part.as_str(), verb]);
                rendered.push((method_id.clone(), self.render_method(&api, &resource, binding, method)?));

                let function = &self.handler(&method.handler.name)?.function;
                let permission = segment_id(&[binding.path_part.as_str(), verb, "Permission"]);
                rendered.push((
                    permission,
                    json!({
                        "Type": "AWS::Lambda::Permission",
                        "Properties": {
                            "Action": "lambda:InvokeFunction",
                            "FunctionName": { "Fn::GetAtt": [function, "Arn"] },
                            "Principal": "apigateway.amazonaws.com",
                            "SourceArn": execute_api_arn(&api, &stage, verb, &binding.path),
                        },
                    }),
                ));
                method_ids.push(method_id);
            }
        }

        rendered.push((
            deployment.clone(),
            json!({
                "Type": "AWS::ApiGateway::Deployment",
                "Properties": { "RestApiId": { "Ref": api }, "Description": surface.id },
                "DependsOn": method_ids,
            }),
        ));
        rendered.push((
            stage.clone(),
            json!({
                "Type": "AWS::ApiGateway::Stage",
                "Properties": {
                    "RestApiId": { "Ref": api },
                    "DeploymentId": { "Ref": deployment },
                    "StageName": self.stage,
                },
            }),
        ));

        self.insert_all(rendered)?;
        self.template.outputs.insert(
            logical_id(&[&self.stack, "api", &surface.id, "Endpoint"]),
            json!({
                "Value": {
                    "Fn::Join": ["", [
                        "https://", { "Ref": api },
                        ".execute-api.", { "Ref": "AWS::Region" },
                        ".", { "Ref": "AWS::URLSuffix" },
                        "/", { "Ref": stage }, "/",
                    ]]
                }
            }),
        );

        tracing::info!(surface = %surface.id, logical_id = %api, "Routing surface provisioned");
        Ok(())
    }

    fn apply_grant(&mut self, bucket: &BucketId, grant: &GrantRequirement) -> Result<(), ProvisionError> {
        let bucket_id = self.bucket_logical_id(bucket)?;
        let role = self.handler(&grant.handler.name)?.role.clone();

        if grant.level == GrantLevel::None {
            tracing::debug!(handler = %grant.handler.name, "No storage access granted");
            return Ok(());
        }

        let id = logical_id(&[&self.stack, "handlers", &grant.handler.name, "BucketGrant"]);
        self.insert(
            &id,
            json!({
                "Type": "AWS::IAM::Policy",
                "Properties": {
                    "PolicyName": id,
                    "Roles": [{ "Ref": role }],
                    "PolicyDocument": {
                        "Statement": [{
                            "Action": s3_actions(grant.level),
                            "Effect": "Allow",
                            "Resource": bucket_arns(&bucket_id),
                        }],
                        "Version": POLICY_VERSION,
                    },
                },
            }),
        )?;

        tracing::info!(handler = %grant.handler.name, level = %grant.level, "Grant applied");
        Ok(())
    }
}

fn bucket_arns(bucket: &str) -> Value {
    json!([
        { "Fn::GetAtt": [bucket, "Arn"] },
        { "Fn::Join": ["", [{ "Fn::GetAtt": [bucket, "Arn"] }, "/*"]] },
    ])
}

fn invocation_uri(function: &str) -> Value {
    json!({
        "Fn::Join": ["", [
            "arn:", { "Ref": "AWS::Partition" },
            ":apigateway:", { "Ref": "AWS::Region" },
            ":lambda:path/2015-03-31/functions/",
            { "Fn::GetAtt": [function, "Arn"] },
            "/invocations",
        ]]
    })
}

fn execute_api_arn(api: &str, stage: &str, verb: &str, path: &str) -> Value {
    json!({
        "Fn::Join": ["", [
            "arn:", { "Ref": "AWS::Partition" },
            ":execute-api:", { "Ref": "AWS::Region" },
            ":", { "Ref": "AWS::AccountId" },
            ":", { "Ref": api },
            "/", { "Ref": stage },
            format!("/{verb}{path}"),
        ]]
    })
}

fn render_integration_extras(target: &mut Value, integration: &Integration) {
    if integration.mode == IntegrationMode::PassThrough {
        return;
    }
    if !integration.request_parameters.is_empty() {
        target["RequestParameters"] = json!(integration.request_parameters);
    }
    if let Some(passthrough) = integration.passthrough {
        target["PassthroughBehavior"] = json!(passthrough);
    }
    if !integration.responses.is_empty() {
        target["IntegrationResponses"] = integration
            .responses
            .iter()
            .map(|r| {
                json!({
                    "StatusCode": r.status_code.to_string(),
                    "ResponseParameters": r.response_parameters,
                })
            })
            .collect();
    }
}

fn render_method_response(response: &MethodResponse) -> Value {
    json!({
        "StatusCode": response.status_code.to_string(),
        "ResponseParameters": response.response_parameters(),
        "ResponseModels": response.models,
    })
}
