//! The page cache and coordinator: generation-stamped handles over a fixed
//! pool of page-sized buffers, composed with the file manager into a single
//! context object the table store and B+-tree index share.
//!
//! # Example
//!
//! ```no_run
//! use buffer::Coordinator;
//!
//! let mut coord = Coordinator::new(1024);
//! coord.create_file("/tmp/t.tbl").unwrap();
//! let fd = coord.open_file("/tmp/t.tbl").unwrap();
//! let mut handle = coord.get_handle(fd, 0).unwrap();
//! coord.mark_dirty(&handle).unwrap();
//! let page = coord.load_mut(&mut handle).unwrap();
//! page[0] = 42;
//! ```

mod cache;
mod coordinator;


pub use cache::{PageCache, PageHandle};
pub use coordinator::Coordinator;
