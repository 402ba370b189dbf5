use std::sync::Arc;
use std::time::Duration;

use procvisor::{
    Config, ConsoleLogger, LaunchSpec, LogAggregatorTask, ProcessTask, ShutdownCause, Subscribe,
    Supervisor, TaskSpec,
};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let mut cfg = Config::default();
    cfg.port = Some(3000);
    cfg.grace = Duration::from_secs(5);

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(ConsoleLogger)];
    let supervisor = Supervisor::builder(cfg).with_subscribers(subs).build();

    // A stand-in dev stack: one producer appending to the followed log,
    // one long-running "server". Ctrl-C tears the whole group down.
    let tasks = vec![
        TaskSpec::new(LogAggregatorTask::arc(
            "logs",
            vec!["demo-logs/app.log".into()],
        )),
        TaskSpec::new(ProcessTask::arc(LaunchSpec::new(
            "app",
            vec![
                "/bin/sh".into(),
                "-c".into(),
                "while :; do echo heartbeat >> demo-logs/app.log; sleep 2; done".into(),
            ],
        )))
        .with_settle(Duration::from_secs(1)),
        TaskSpec::new(ProcessTask::arc(LaunchSpec::new(
            "web",
            vec!["/bin/sh".into(), "-c".into(), "sleep 600".into()],
        ))),
    ];

    match supervisor.run(tasks).await? {
        ShutdownCause::Signal(sig) => sig.reraise(),
        cause => std::process::exit(cause.exit_code()),
    }
}
