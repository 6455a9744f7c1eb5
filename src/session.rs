// Debug session
//
// Wires a low-level connection to one event manager, one dispatcher thread
// and one profile per event kind. Contains no pipeline logic of its own.

use crate::connection::{DebuggerConnection, VmState};
use crate::events::{spawn_dispatcher, EventDispatcher, EventManager};
use crate::profiles::{
    AccessWatchpointProfile, BreakpointProfile, ClassPrepareProfile, ClassUnloadProfile,
    ExceptionProfile, MethodEntryProfile, MethodExitProfile, MonitorContendedEnterProfile,
    MonitorContendedEnteredProfile, MonitorWaitProfile, MonitorWaitedProfile,
    ModificationWatchpointProfile, StepProfile, ThreadDeathProfile, ThreadStartProfile,
    VmDeathProfile, VmDisconnectProfile, VmStartProfile,
};
use crate::requests::{
    AccessWatchpointRequestManager, BreakpointRequestManager, ClassPrepareRequestManager,
    ClassUnloadRequestManager, ExceptionRequestManager, MethodEntryRequestManager,
    MethodExitRequestManager, ModificationWatchpointRequestManager,
    MonitorContendedEnterRequestManager, MonitorContendedEnteredRequestManager,
    MonitorWaitRequestManager, MonitorWaitedRequestManager, StepRequestManager,
    ThreadDeathRequestManager, ThreadStartRequestManager, VmDeathRequestManager,
};
use std::sync::Arc;
use tracing::info;

pub struct DebugSession {
    vm: Arc<VmState>,
    events: EventManager,
    dispatcher: EventDispatcher,
    breakpoint: BreakpointProfile,
    method_entry: MethodEntryProfile,
    method_exit: MethodExitProfile,
    monitor_wait: MonitorWaitProfile,
    monitor_waited: MonitorWaitedProfile,
    monitor_contended_enter: MonitorContendedEnterProfile,
    monitor_contended_entered: MonitorContendedEnteredProfile,
    class_prepare: ClassPrepareProfile,
    class_unload: ClassUnloadProfile,
    thread_start: ThreadStartProfile,
    thread_death: ThreadDeathProfile,
    exception: ExceptionProfile,
    access_watchpoint: AccessWatchpointProfile,
    modification_watchpoint: ModificationWatchpointProfile,
    step: StepProfile,
    vm_start: VmStartProfile,
    vm_death: VmDeathProfile,
    vm_disconnect: VmDisconnectProfile,
}

impl DebugSession {
    /// Attach to a connected debuggee: spawns the dispatcher thread and
    /// builds the full profile set.
    pub fn attach(connection: Arc<dyn DebuggerConnection>) -> Self {
        let vm = Arc::new(VmState::new());
        let events = EventManager::new(vm.clone());
        let dispatcher = spawn_dispatcher(connection.clone(), events.clone());
        info!("debug session attached");

        let breakpoint = BreakpointProfile::new(
            Arc::new(BreakpointRequestManager::new_breakpoint(
                connection.clone(),
                vm.clone(),
            )),
            events.clone(),
        );
        let method_entry = MethodEntryProfile::new(
            Arc::new(MethodEntryRequestManager::new_method_entry(
                connection.clone(),
                vm.clone(),
            )),
            events.clone(),
        );
        let method_exit = MethodExitProfile::new(
            Arc::new(MethodExitRequestManager::new_method_exit(
                connection.clone(),
                vm.clone(),
            )),
            events.clone(),
        );
        let monitor_wait = MonitorWaitProfile::new(
            Arc::new(MonitorWaitRequestManager::new_monitor_wait(
                connection.clone(),
                vm.clone(),
            )),
            events.clone(),
        );
        let monitor_waited = MonitorWaitedProfile::new(
            Arc::new(MonitorWaitedRequestManager::new_monitor_waited(
                connection.clone(),
                vm.clone(),
            )),
            events.clone(),
        );
        let monitor_contended_enter = MonitorContendedEnterProfile::new(
            Arc::new(
                MonitorContendedEnterRequestManager::new_monitor_contended_enter(
                    connection.clone(),
                    vm.clone(),
                ),
            ),
            events.clone(),
        );
        let monitor_contended_entered = MonitorContendedEnteredProfile::new(
            Arc::new(
                MonitorContendedEnteredRequestManager::new_monitor_contended_entered(
                    connection.clone(),
                    vm.clone(),
                ),
            ),
            events.clone(),
        );
        let class_prepare = ClassPrepareProfile::new(
            Arc::new(ClassPrepareRequestManager::new_class_prepare(
                connection.clone(),
                vm.clone(),
            )),
            events.clone(),
        );
        let class_unload = ClassUnloadProfile::new(
            Arc::new(ClassUnloadRequestManager::new_class_unload(
                connection.clone(),
                vm.clone(),
            )),
            events.clone(),
        );
        let thread_start = ThreadStartProfile::new(
            Arc::new(ThreadStartRequestManager::new_thread_start(
                connection.clone(),
                vm.clone(),
            )),
            events.clone(),
        );
        let thread_death = ThreadDeathProfile::new(
            Arc::new(ThreadDeathRequestManager::new_thread_death(
                connection.clone(),
                vm.clone(),
            )),
            events.clone(),
        );
        let exception = ExceptionProfile::new(
            Arc::new(ExceptionRequestManager::new_exception(
                connection.clone(),
                vm.clone(),
            )),
            events.clone(),
        );
        let access_watchpoint = AccessWatchpointProfile::new(
            Arc::new(AccessWatchpointRequestManager::new_access_watchpoint(
                connection.clone(),
                vm.clone(),
            )),
            events.clone(),
        );
        let modification_watchpoint = ModificationWatchpointProfile::new(
            Arc::new(
                ModificationWatchpointRequestManager::new_modification_watchpoint(
                    connection.clone(),
                    vm.clone(),
                ),
            ),
            events.clone(),
        );
        let step = StepProfile::new(
            Arc::new(StepRequestManager::new_step(connection.clone(), vm.clone())),
            events.clone(),
        );
        let vm_death = VmDeathProfile::new(
            Arc::new(VmDeathRequestManager::new_vm_death(connection, vm.clone())),
            events.clone(),
        );
        let vm_start = VmStartProfile::new(events.clone());
        let vm_disconnect = VmDisconnectProfile::new(events.clone());

        Self {
            vm,
            events,
            dispatcher,
            breakpoint,
            method_entry,
            method_exit,
            monitor_wait,
            monitor_waited,
            monitor_contended_enter,
            monitor_contended_entered,
            class_prepare,
            class_unload,
            thread_start,
            thread_death,
            exception,
            access_watchpoint,
            modification_watchpoint,
            step,
            vm_start,
            vm_death,
            vm_disconnect,
        }
    }

    pub fn breakpoint(&self) -> &BreakpointProfile {
        &self.breakpoint
    }

    pub fn method_entry(&self) -> &MethodEntryProfile {
        &self.method_entry
    }

    pub fn method_exit(&self) -> &MethodExitProfile {
        &self.method_exit
    }

    pub fn monitor_wait(&self) -> &MonitorWaitProfile {
        &self.monitor_wait
    }

    pub fn monitor_waited(&self) -> &MonitorWaitedProfile {
        &self.monitor_waited
    }

    pub fn monitor_contended_enter(&self) -> &MonitorContendedEnterProfile {
        &self.monitor_contended_enter
    }

    pub fn monitor_contended_entered(&self) -> &MonitorContendedEnteredProfile {
        &self.monitor_contended_entered
    }

    pub fn class_prepare(&self) -> &ClassPrepareProfile {
        &self.class_prepare
    }

    pub fn class_unload(&self) -> &ClassUnloadProfile {
        &self.class_unload
    }

    pub fn thread_start(&self) -> &ThreadStartProfile {
        &self.thread_start
    }

    pub fn thread_death(&self) -> &ThreadDeathProfile {
        &self.thread_death
    }

    pub fn exception(&self) -> &ExceptionProfile {
        &self.exception
    }

    pub fn access_watchpoint(&self) -> &AccessWatchpointProfile {
        &self.access_watchpoint
    }

    pub fn modification_watchpoint(&self) -> &ModificationWatchpointProfile {
        &self.modification_watchpoint
    }

    pub fn step(&self) -> &StepProfile {
        &self.step
    }

    pub fn vm_start(&self) -> &VmStartProfile {
        &self.vm_start
    }

    pub fn vm_death(&self) -> &VmDeathProfile {
        &self.vm_death
    }

    pub fn vm_disconnect(&self) -> &VmDisconnectProfile {
        &self.vm_disconnect
    }

    pub fn events(&self) -> &EventManager {
        &self.events
    }

    pub fn is_terminated(&self) -> bool {
        self.vm.is_terminated()
    }

    /// Stop the dispatcher and close every live stream.
    pub fn shutdown(&mut self) {
        self.dispatcher.stop();
        self.events.close_all();
        info!("debug session shut down");
    }
}
