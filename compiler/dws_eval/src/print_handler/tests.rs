#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_buffer_handler_println() {
    let handler = BufferPrintHandler::new();
    handler.println("hello");
    handler.println("world");
    assert_eq!(handler.get_output(), "hello\nworld\n");
}

#[test]
fn test_buffer_handler_print_and_clear() {
    let handler = BufferPrintHandler::new();
    handler.print("a");
    handler.print("b");
    assert_eq!(handler.get_output(), "ab");
    handler.clear();
    assert_eq!(handler.get_output(), "");
}

#[test]
fn test_shared_handlers() {
    let buffer = buffer_handler();
    buffer.println("x");
    assert_eq!(buffer.get_output(), "x\n");

    let silent = silent_handler();
    silent.println("dropped");
    assert_eq!(silent.get_output(), "");

    let stdout = stdout_handler();
    assert_eq!(stdout.get_output(), "");
}

#[test]
fn test_buffer_handler_is_thread_safe() {
    let handler = buffer_handler();
    let threads: Vec<_> = (0..4)
        .map(|i| {
            let handler = Arc::clone(&handler);
            std::thread::spawn(move || handler.println(&format!("line {i}")))
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }
    assert_eq!(handler.get_output().lines().count(), 4);
}
