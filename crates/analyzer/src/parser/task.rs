//! Task assembly: folds main-log events into tasks, nodes and controllers.

use std::collections::{BTreeMap, HashMap};
use tracing::trace;

use super::fields::{json_str, json_u64};
use super::model::{
    ControllerInfo, ControllerKind, MainLogEvent, NodeInfo, TaskInfo, TaskStatus,
};

const TASK_STARTING: &str = "Tasker.Task.Starting";
const TASK_SUCCEEDED: &str = "Tasker.Task.Succeeded";
const TASK_FAILED: &str = "Tasker.Task.Failed";
const NODE_PREFIX: &str = "Node.PipelineNode.";
const RECOGNITION_PREFIX: &str = "Node.Recognition.";
const ACTION_PREFIX: &str = "Node.Action.";
const CONTROLLER_PREFIX: &str = "Controller.Action.";

#[derive(Debug, Default)]
pub struct Assembled {
    pub tasks: Vec<TaskInfo>,
    pub controllers: Vec<ControllerInfo>,
    pub identifier_map: BTreeMap<u64, String>,
}

/// Builds tasks from one file's events, in file order.
#[derive(Debug)]
pub struct TaskAssembler {
    file_name: String,
    tasks: Vec<TaskInfo>,
    /// task_id → index of the running task in `tasks`
    open: HashMap<u64, usize>,
    controllers: Vec<ControllerInfo>,
    controller_index: HashMap<u64, usize>,
    identifier_map: BTreeMap<u64, String>,
}

impl TaskAssembler {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            tasks: Vec::new(),
            open: HashMap::new(),
            controllers: Vec::new(),
            controller_index: HashMap::new(),
            identifier_map: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, event: &MainLogEvent) {
        let name = event.message.as_str();
        match name {
            TASK_STARTING => self.start_task(event),
            TASK_SUCCEEDED => self.finish_task(event, TaskStatus::Succeeded),
            TASK_FAILED => self.finish_task(event, TaskStatus::Failed),
            _ if name.starts_with(NODE_PREFIX) => self.node_event(event, &name[NODE_PREFIX.len()..]),
            _ if name.starts_with(RECOGNITION_PREFIX) => {
                if name.ends_with(".Starting") {
                    if let Some(node) = self.running_node(event) {
                        node.recognitions += 1;
                    }
                }
            }
            _ if name.starts_with(ACTION_PREFIX) => {
                if name.ends_with(".Starting") {
                    if let Some(node) = self.running_node(event) {
                        node.actions += 1;
                    }
                }
            }
            _ if name.starts_with(CONTROLLER_PREFIX) => self.controller_event(event),
            _ => trace!(event = name, line = event.line_number, "Ignoring event"),
        }
    }

    pub fn finish(self) -> Assembled {
        Assembled {
            tasks: self.tasks,
            controllers: self.controllers,
            identifier_map: self.identifier_map,
        }
    }

    fn start_task(&mut self, event: &MainLogEvent) {
        let Some(task_id) = json_u64(&event.details, "task_id") else {
            trace!(line = event.line_number, "Task start without task_id");
            return;
        };

        let identifier = json_str(&event.details, "uuid").map(str::to_string);
        if let Some(uuid) = &identifier {
            self.identifier_map.insert(task_id, uuid.clone());
        }

        let task = TaskInfo {
            task_id,
            key: format!("{}#{}@{}", self.file_name, task_id, event.line_number),
            entry: json_str(&event.details, "entry").unwrap_or_default().to_string(),
            status: TaskStatus::Running,
            start_time: event.timestamp.clone(),
            end_time: None,
            start_time_ms: event.timestamp_ms,
            end_time_ms: None,
            nodes: Vec::new(),
            process_id: event.process_id.clone(),
            thread_id: event.thread_id.clone(),
            identifier,
            hash: json_str(&event.details, "hash").map(str::to_string),
            file_name: self.file_name.clone(),
        };

        self.open.insert(task_id, self.tasks.len());
        self.tasks.push(task);
    }

    fn finish_task(&mut self, event: &MainLogEvent, status: TaskStatus) {
        let Some(task_id) = json_u64(&event.details, "task_id") else {
            return;
        };
        let Some(idx) = self.open.remove(&task_id) else {
            trace!(task_id, line = event.line_number, "Task end without start");
            return;
        };

        let task = &mut self.tasks[idx];
        task.status = status;
        task.end_time = Some(event.timestamp.clone());
        task.end_time_ms = event.timestamp_ms;

        for node in task.nodes.iter_mut().filter(|n| n.status == TaskStatus::Running) {
            node.status = status;
            node.end_time = Some(event.timestamp.clone());
        }
    }

    fn open_task(&mut self, event: &MainLogEvent) -> Option<&mut TaskInfo> {
        let task_id = json_u64(&event.details, "task_id")?;
        let idx = *self.open.get(&task_id)?;
        self.tasks.get_mut(idx)
    }

    fn node_event(&mut self, event: &MainLogEvent, phase: &str) {
        let node_id = json_u64(&event.details, "node_id");
        let name = json_str(&event.details, "name").unwrap_or_default().to_string();
        let timestamp = event.timestamp.clone();
        let Some(task) = self.open_task(event) else {
            return;
        };

        match phase {
            "Starting" => task.nodes.push(NodeInfo {
                node_id,
                name,
                status: TaskStatus::Running,
                start_time: timestamp,
                end_time: None,
                recognitions: 0,
                actions: 0,
            }),
            "Succeeded" | "Failed" => {
                let status = if phase == "Succeeded" {
                    TaskStatus::Succeeded
                } else {
                    TaskStatus::Failed
                };
                let node = task.nodes.iter_mut().rev().find(|n| {
                    n.status == TaskStatus::Running
                        && match node_id {
                            Some(id) => n.node_id == Some(id),
                            None => n.name == name,
                        }
                });
                if let Some(node) = node {
                    node.status = status;
                    node.end_time = Some(timestamp);
                }
            }
            _ => {}
        }
    }

    fn running_node(&mut self, event: &MainLogEvent) -> Option<&mut NodeInfo> {
        self.open_task(event)?
            .nodes
            .iter_mut()
            .rev()
            .find(|n| n.status == TaskStatus::Running)
    }

    fn controller_event(&mut self, event: &MainLogEvent) {
        let Some(ctrl_id) = json_u64(&event.details, "ctrl_id") else {
            return;
        };

        let idx = match self.controller_index.get(&ctrl_id) {
            Some(idx) => *idx,
            None => {
                let address = json_str(&event.details, "address")
                    .or_else(|| {
                        event
                            .details
                            .get("param")
                            .and_then(|p| json_str(p, "address"))
                    })
                    .map(str::to_string);

                self.controllers.push(ControllerInfo {
                    ctrl_id,
                    uuid: json_str(&event.details, "uuid").map(str::to_string),
                    kind: controller_kind(event),
                    address,
                    process_id: event.process_id.clone(),
                    first_seen: event.timestamp.clone(),
                    action_count: 0,
                });
                self.controller_index.insert(ctrl_id, self.controllers.len() - 1);
                self.controllers.len() - 1
            }
        };

        if event.message.ends_with(".Starting") {
            self.controllers[idx].action_count += 1;
        }
    }
}

fn controller_kind(event: &MainLogEvent) -> ControllerKind {
    let hint = json_str(&event.details, "type")
        .map(str::to_ascii_lowercase)
        .or_else(|| event.function.as_deref().map(str::to_ascii_lowercase))
        .unwrap_or_default();

    if hint.contains("adb") {
        ControllerKind::Adb
    } else if hint.contains("win32") {
        ControllerKind::Win32
    } else if hint.contains("custom") {
        ControllerKind::Custom
    } else {
        ControllerKind::Unknown
    }
}
