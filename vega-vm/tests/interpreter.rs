//! Direct interpreter scenarios (spec §8), independent of the CLI driver.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::time::{Duration, Instant};

use vega_agent::AgentManager;
use vega_bytecode::{FunctionBuilder, ImageBuilder, Op};
use vega_process::{ExitReason, ProcessTable};
use vega_scheduler::{Scheduler, SchedulerStatus};
use vega_value::Value;
use vega_vm::Vm;

/// A one-shot mock Anthropic endpoint: accepts a single connection,
/// waits `delay` before replying, then answers with a minimal
/// successful `content`/`usage` body carrying `reply_text`.
///
/// Returns the `http://127.0.0.1:<port>/v1/messages` URL to point an
/// [`AgentManager`] at.
fn spawn_mock_server(reply_text: &str, delay: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind a loopback port");
    let port = listener.local_addr().expect("listener has a local address").port();
    let reply_text = reply_text.to_string();

    std::thread::spawn(move || {
        let (stream, _) = listener.accept().expect("test client connects");
        let mut reader = BufReader::new(stream.try_clone().expect("clone stream for reading"));

        // Drain the request headers; we don't need the body's contents.
        let mut line = String::new();
        loop {
            line.clear();
            let n = reader.read_line(&mut line).expect("read request line");
            if n == 0 || line == "\r\n" {
                break;
            }
        }

        std::thread::sleep(delay);

        let body = serde_json::json!({
            "content": [{"type": "text", "text": reply_text}],
            "usage": {"input_tokens": 10, "output_tokens": 5},
        })
        .to_string();
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let mut stream = stream;
        stream.write_all(response.as_bytes()).expect("write mock response");
        stream.flush().expect("flush mock response");
    });

    format!("http://127.0.0.1:{port}/v1/messages")
}

#[test]
fn call_function_evaluates_arithmetic() {
    let mut b = ImageBuilder::new();
    let two = b.intern_int(2);
    let three = b.intern_int(3);
    let four = b.intern_int(4);
    let add_mul = FunctionBuilder::new("add_mul", 0, 0)
        .op(Op::PushConst(two))
        .op(Op::PushConst(three))
        .op(Op::PushConst(four))
        .op(Op::Mul)
        .op(Op::Add)
        .op(Op::Return);
    b.function(add_mul);
    let image = b.build();

    let mut vm = Vm::new(image, "");
    let mut table = ProcessTable::new();
    let result = vm.call_function(&mut table, 0, Vec::new()).expect("runs to completion");
    assert!(matches!(result, Value::Int(14)));
}

#[test]
fn call_function_concatenates_strings() {
    let mut b = ImageBuilder::new();
    let hello = b.intern_str("hello, ");
    let world = b.intern_str("world");
    let greet = FunctionBuilder::new("greet", 0, 0)
        .op(Op::PushConst(hello))
        .op(Op::PushConst(world))
        .op(Op::StrConcat)
        .op(Op::Return);
    b.function(greet);
    let image = b.build();

    let mut vm = Vm::new(image, "");
    let mut table = ProcessTable::new();
    let result = vm.call_function(&mut table, 0, Vec::new()).expect("runs to completion");
    assert_eq!(result.stringify(), "hello, world");
}

#[test]
fn call_function_rejects_arity_mismatch() {
    let mut b = ImageBuilder::new();
    let identity = FunctionBuilder::new("identity", 1, 1).op(Op::LoadLocal(0)).op(Op::Return);
    b.function(identity);
    let image = b.build();

    let mut vm = Vm::new(image, "");
    let mut table = ProcessTable::new();
    let err = vm.call_function(&mut table, 0, Vec::new()).unwrap_err();
    assert!(matches!(err, vega_vm::VmError::ArityMismatch { expected: 1, found: 0 }));
}

/// `fact(5) == 120`, run the same way `vega`'s driver runs a whole
/// program: spawned onto a process table, driven by the scheduler to
/// quiescence, and checked via the process's exit status.
#[test]
fn scheduler_runs_recursive_factorial_to_completion() {
    let mut b = ImageBuilder::new();
    let one = b.intern_int(1);
    let fact_name = b.intern_str("fact");

    let dry = FunctionBuilder::new("fact", 1, 1).op(Op::LoadLocal(0)).op(Op::PushConst(one)).op(Op::Le);
    let dry = dry.op(Op::JumpIfNot(0));
    let pos_after_jump = dry.len();
    let dry = dry.op(Op::PushConst(one)).op(Op::Return);
    let else_start = dry.len();
    let jump_offset = i16::try_from(else_start as isize - pos_after_jump as isize).unwrap();

    let fact = FunctionBuilder::new("fact", 1, 1)
        .op(Op::LoadLocal(0))
        .op(Op::PushConst(one))
        .op(Op::Le)
        .op(Op::JumpIfNot(jump_offset))
        .op(Op::PushConst(one))
        .op(Op::Return)
        .op(Op::LoadLocal(0))
        .op(Op::LoadGlobal(fact_name))
        .op(Op::LoadLocal(0))
        .op(Op::PushConst(one))
        .op(Op::Sub)
        .op(Op::Call(1))
        .op(Op::Mul)
        .op(Op::Return);
    b.function(fact);

    let five = b.intern_int(5);
    let main = FunctionBuilder::new("main", 0, 0)
        .op(Op::LoadGlobal(fact_name))
        .op(Op::PushConst(five))
        .op(Op::Call(1))
        .op(Op::ExitProcess(0))
        .op(Op::PushNull)
        .op(Op::Return);
    b.function(main);

    let image = b.build();
    let mut vm = Vm::new(image, "");
    let mut table = ProcessTable::new();
    let mut scheduler = Scheduler::new();
    let pid = vm.spawn_entry_process(&mut table, &mut scheduler).expect("entry process spawns");

    let mut now_ms = 0u64;
    loop {
        match scheduler.run_to_quiescence(&mut table, &mut vm, now_ms) {
            SchedulerStatus::Done => break,
            SchedulerStatus::Idle => now_ms += 1,
        }
    }

    let status = table.get(pid).and_then(vega_process::Process::exit_status).expect("process exited");
    assert_eq!(status.reason, ExitReason::Normal);
}

/// `SEND_ASYNC` then `AWAIT` against a real (if mock) endpoint that
/// deliberately doesn't answer on the first scheduler tick: covers the
/// exact path the stack stayed parked on a `Pending` future and had to
/// survive the re-executed `AWAIT` opcode without crashing (spec §8.4).
#[test]
fn scheduler_resolves_send_async_after_it_is_still_pending_on_first_poll() {
    let base_url = spawn_mock_server("the mock replied", Duration::from_millis(300));

    let mut b = ImageBuilder::new();
    let agent_name_idx = b.intern_str("researcher");
    let prompt = b.intern_str("what is the weather");
    b.agent("researcher", "claude-test", "be concise", 0, 0.0);

    let main = FunctionBuilder::new("main", 0, 0)
        .op(Op::SpawnAgent(agent_name_idx))
        .op(Op::PushConst(prompt))
        .op(Op::SendAsync)
        .op(Op::Await)
        .op(Op::ExitProcess(1));
    b.function(main);
    let image = b.build();

    let agents = AgentManager::with_base_url("test-key", base_url);
    let mut vm = Vm::with_agent_manager(image, agents);
    let mut table = ProcessTable::new();
    let mut scheduler = Scheduler::new();
    let pid = vm.spawn_entry_process(&mut table, &mut scheduler).expect("entry process spawns");

    let start = Instant::now();
    let mut now_ms = 0u64;
    loop {
        match scheduler.run_to_quiescence(&mut table, &mut vm, now_ms) {
            SchedulerStatus::Done => break,
            SchedulerStatus::Idle => {
                assert!(start.elapsed() < Duration::from_secs(10), "mock send never resolved");
                std::thread::sleep(Duration::from_millis(10));
                now_ms += 10;
            }
        }
    }

    let status = table.get(pid).and_then(vega_process::Process::exit_status).expect("process exited");
    assert_eq!(status.reason, ExitReason::Error);
    assert_eq!(status.message.as_deref(), Some("the mock replied"));
}
