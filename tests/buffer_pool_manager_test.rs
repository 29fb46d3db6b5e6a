//! Buffer Pool Manager Tests
//!
//! Scenario tests in the style of BusTub's buffer_pool_manager_test.cpp,
//! run against a disk-backed page file.

use std::sync::Arc;

use clockpool::{BufferPoolManager, DiskFile, Error, FileRef, PageId};
use tempfile::tempdir;

const FRAMES: usize = 10;

fn create_bpm(pool_size: usize) -> (BufferPoolManager, FileRef, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");
    let file: FileRef = Arc::new(DiskFile::create(&path).unwrap());
    (BufferPoolManager::new(pool_size), file, dir)
}

/// Helper to write a string to page data.
fn copy_string(data: &mut [u8], s: &str) {
    let bytes = s.as_bytes();
    data[..bytes.len()].copy_from_slice(bytes);
    data[bytes.len()] = 0; // null terminator
}

/// Helper to read a null-terminated string from page data.
fn read_string(data: &[u8]) -> String {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).to_string()
}

// ============================================================================
// VeryBasicTest
// ============================================================================

#[test]
fn test_very_basic() {
    let (bpm, file, _dir) = create_bpm(FRAMES);
    let str_data = "Hello, world!";

    let (pid, mut handle) = bpm.new_page(&file).unwrap();

    {
        let mut page = handle.write();
        copy_string(page.payload_mut(), str_data);
        assert_eq!(read_string(page.payload()), str_data);
    }
    drop(handle);

    {
        let handle = bpm.fetch_page(&file, pid).unwrap();
        assert_eq!(read_string(handle.read().payload()), str_data);
    }

    {
        let handle = bpm.fetch_page(&file, pid).unwrap();
        assert_eq!(read_string(handle.read().payload()), str_data);
    }

    assert!(bpm.dispose_page(&file, pid).is_ok());
    assert!(!bpm.is_resident(&file, pid));
}

// ============================================================================
// PagePinEasyTest
// ============================================================================

#[test]
fn test_page_pin_easy() {
    let (bpm, file, _dir) = create_bpm(2);

    let str0 = "page0";
    let str1 = "page1";
    let str0_updated = "page0updated";
    let str1_updated = "page1updated";

    let (pageid0, mut page0) = bpm.new_page(&file).unwrap();
    let (pageid1, mut page1) = bpm.new_page(&file).unwrap();
    copy_string(page0.write().payload_mut(), str0);
    copy_string(page1.write().payload_mut(), str1);

    assert_eq!(bpm.pin_count(&file, pageid0), Some(1));
    assert_eq!(bpm.pin_count(&file, pageid1), Some(1));

    // All frames pinned - no room for another page.
    assert!(matches!(bpm.new_page(&file), Err(Error::PoolExhausted)));

    drop(page0);
    assert_eq!(bpm.pin_count(&file, pageid0), Some(0));
    drop(page1);
    assert_eq!(bpm.pin_count(&file, pageid1), Some(0));

    // Now two new pages fit, evicting (and writing back) both originals.
    let (temp1, h) = bpm.new_page(&file).unwrap();
    drop(h);
    let (temp2, h) = bpm.new_page(&file).unwrap();
    drop(h);
    assert!(bpm.is_resident(&file, temp1));
    assert!(bpm.is_resident(&file, temp2));
    assert!(bpm.pin_count(&file, pageid0).is_none());
    assert!(bpm.pin_count(&file, pageid1).is_none());

    {
        // Fetch original pages back - reloaded from disk.
        let mut page0 = bpm.fetch_page(&file, pageid0).unwrap();
        assert_eq!(read_string(page0.read().payload()), str0);
        copy_string(page0.write().payload_mut(), str0_updated);

        let mut page1 = bpm.fetch_page(&file, pageid1).unwrap();
        assert_eq!(read_string(page1.read().payload()), str1);
        copy_string(page1.write().payload_mut(), str1_updated);

        assert_eq!(bpm.pin_count(&file, pageid0), Some(1));
        assert_eq!(bpm.pin_count(&file, pageid1), Some(1));
    }

    assert_eq!(bpm.pin_count(&file, pageid0), Some(0));
    assert_eq!(bpm.pin_count(&file, pageid1), Some(0));

    {
        let page0 = bpm.fetch_page(&file, pageid0).unwrap();
        assert_eq!(read_string(page0.read().payload()), str0_updated);
        let page1 = bpm.fetch_page(&file, pageid1).unwrap();
        assert_eq!(read_string(page1.read().payload()), str1_updated);
    }
}

// ============================================================================
// PagePinMediumTest
// ============================================================================

#[test]
fn test_page_pin_medium() {
    let (bpm, file, _dir) = create_bpm(FRAMES);

    // Scenario: The buffer pool is empty. We should be able to create a new page.
    let (pid0, mut page0) = bpm.new_page(&file).unwrap();

    // Scenario: Once we have a page, we should be able to read and write content.
    let hello = "Hello";
    copy_string(page0.write().payload_mut(), hello);
    assert_eq!(read_string(page0.read().payload()), hello);
    drop(page0);

    // Scenario: We should be able to create new pages until we fill up the buffer pool.
    let mut pages = Vec::new();
    for _ in 0..FRAMES {
        let (_pid, handle) = bpm.new_page(&file).unwrap();
        pages.push(handle);
    }

    // Scenario: All of the pin counts should be 1.
    for page in &pages {
        assert_eq!(bpm.pin_count(&file, page.page_id()), Some(1));
    }

    // Scenario: Once the buffer pool is full, we should not be able to create any new pages.
    for _ in 0..FRAMES {
        assert!(matches!(bpm.new_page(&file), Err(Error::PoolExhausted)));
    }

    // Scenario: Drop the first 5 pages to unpin them.
    for _ in 0..(FRAMES / 2) {
        let pid = pages[0].page_id();
        assert_eq!(bpm.pin_count(&file, pid), Some(1));
        pages.remove(0);
        assert_eq!(bpm.pin_count(&file, pid), Some(0));
    }

    // Scenario: All of the pin counts of the pages we haven't dropped yet should still be 1.
    for page in &pages {
        assert_eq!(bpm.pin_count(&file, page.page_id()), Some(1));
    }

    // Scenario: After unpinning pages, we should be able to create new pages.
    for _ in 0..((FRAMES / 2) - 1) {
        let (_pid, handle) = bpm.new_page(&file).unwrap();
        pages.push(handle);
    }

    // Scenario: There should be one frame available, and we should be able to fetch the data
    // we wrote a while ago.
    {
        let original_page = bpm.fetch_page(&file, pid0).unwrap();
        assert_eq!(read_string(original_page.read().payload()), hello);
    }

    // Scenario: Once page 0 is unpinned and a new page takes its frame, every frame is
    // pinned again. Fetching page 0 should fail.
    let (_last_pid, _last_page) = bpm.new_page(&file).unwrap();
    assert!(matches!(
        bpm.fetch_page(&file, pid0),
        Err(Error::PoolExhausted)
    ));
}

// ============================================================================
// DropTest
// ============================================================================

#[test]
fn test_drop() {
    let (bpm, file, _dir) = create_bpm(FRAMES);

    {
        let (pid0, page0) = bpm.new_page(&file).unwrap();

        // The page should be pinned.
        assert_eq!(bpm.pin_count(&file, pid0), Some(1));

        // Dropping the handle unpins the page.
        drop(page0);
        assert_eq!(bpm.pin_count(&file, pid0), Some(0));

        // A further unpin is a caller bug and is reported.
        assert!(matches!(
            bpm.unpin_page(&file, pid0, false),
            Err(Error::PageNotPinned { .. })
        ));
        assert_eq!(bpm.pin_count(&file, pid0), Some(0));
    }

    let (pid1, h) = bpm.new_page(&file).unwrap();
    drop(h);
    let (pid2, h) = bpm.new_page(&file).unwrap();
    drop(h);

    {
        let read_page = bpm.fetch_page(&file, pid1).unwrap();
        let mut write_page = bpm.fetch_page(&file, pid2).unwrap();
        write_page.mark_dirty();

        assert_eq!(bpm.pin_count(&file, pid1), Some(1));
        assert_eq!(bpm.pin_count(&file, pid2), Some(1));

        read_page.release().unwrap();
        write_page.release().unwrap();
        assert_eq!(bpm.pin_count(&file, pid1), Some(0));
        assert_eq!(bpm.pin_count(&file, pid2), Some(0));
        assert_eq!(bpm.is_dirty(&file, pid2), Some(true));
    }

    // This will hang if a frame lock was left held.
    {
        let mut h1 = bpm.fetch_page(&file, pid1).unwrap();
        let mut h2 = bpm.fetch_page(&file, pid2).unwrap();
        let _w1 = h1.write();
        let _w2 = h2.write();
    }

    let mut page_ids = Vec::new();
    {
        // Fill up the BPM.
        let mut handles = Vec::new();
        for _ in 0..FRAMES {
            let (new_pid, handle) = bpm.new_page(&file).unwrap();
            assert_eq!(bpm.pin_count(&file, new_pid), Some(1));
            page_ids.push(new_pid);
            handles.push(handle);
        }
    } // This drops all of the handles.

    for pid in &page_ids {
        assert_eq!(bpm.pin_count(&file, *pid), Some(0));
    }

    // Get a new page and edit it. We will retrieve it later.
    let (mutable_page_id, mut mutable_page) = bpm.new_page(&file).unwrap();
    copy_string(mutable_page.write().payload_mut(), "data");
    drop(mutable_page);

    {
        // Fill up the BPM again (evicts mutable_page).
        let mut handles = Vec::new();
        for _ in 0..FRAMES {
            handles.push(bpm.new_page(&file).unwrap().1);
        }
        assert!(!bpm.is_resident(&file, mutable_page_id));
    }

    // Retrieve the page we edited earlier.
    {
        let handle = bpm.fetch_page(&file, mutable_page_id).unwrap();
        assert_eq!(read_string(handle.read().payload()), "data");
    }
}

// ============================================================================
// EvictableTest
// ============================================================================

/// Core invariant: A pinned page cannot be evicted.
#[test]
fn test_evictable() {
    use std::sync::{Condvar, Mutex};
    use std::thread;

    const ROUNDS: usize = 50;
    const NUM_READERS: usize = 4;

    let (bpm, file, _dir) = create_bpm(1); // Only 1 frame
    let bpm = Arc::new(bpm);

    for round in 0..ROUNDS {
        // Create a page that will be the "winner" - it will occupy the only frame.
        let (winner_pid, h) = bpm.new_page(&file).unwrap();
        drop(h);

        // Create a "loser" page - this evicts winner to make room.
        let (loser_pid, h) = bpm.new_page(&file).unwrap();
        drop(h);

        let signal = Arc::new((Mutex::new(false), Condvar::new()));
        let mut readers = Vec::new();

        for _ in 0..NUM_READERS {
            let bpm = Arc::clone(&bpm);
            let file = Arc::clone(&file);
            let signal = Arc::clone(&signal);

            readers.push(thread::spawn(move || {
                let (lock, cvar) = &*signal;
                {
                    let mut started = lock.lock().unwrap();
                    while !*started {
                        started = cvar.wait(started).unwrap();
                    }
                }

                // Main has loaded winner and is holding it pinned.
                let _winner = bpm.fetch_page(&file, winner_pid).unwrap();

                // Since the only frame is pinned, we cannot bring in loser.
                assert!(
                    matches!(bpm.fetch_page(&file, loser_pid), Err(Error::PoolExhausted)),
                    "round {}: loser should not be fetchable while winner is pinned",
                    round
                );
            }));
        }

        // Main thread: fetch winner (evicts loser) and hold it.
        let winner = bpm.fetch_page(&file, winner_pid).unwrap();

        {
            let (lock, cvar) = &*signal;
            *lock.lock().unwrap() = true;
            cvar.notify_all();
        }

        for reader in readers {
            reader.join().unwrap();
        }

        drop(winner);
    }
}

// ============================================================================
// PageAccessTest
// ============================================================================

/// Holding one page's write lock must not stop other pages from being fetched.
#[test]
fn test_page_access() {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    let (bpm, file, _dir) = create_bpm(FRAMES);
    let bpm = Arc::new(bpm);

    let (pid0, h) = bpm.new_page(&file).unwrap();
    drop(h);
    let (pid1, h) = bpm.new_page(&file).unwrap();
    drop(h);

    let mut handle0 = bpm.fetch_page(&file, pid0).unwrap();
    let guard0 = handle0.write();

    let start = Arc::new(AtomicBool::new(false));
    let child = {
        let start = Arc::clone(&start);
        let bpm = Arc::clone(&bpm);
        let file = Arc::clone(&file);
        thread::spawn(move || {
            start.store(true, Ordering::SeqCst);

            // Blocks on the frame lock until main releases page 0.
            let mut handle = bpm.fetch_page(&file, pid0).unwrap();
            handle.write().payload_mut()[0] = 0xC0;
        })
    };

    while !start.load(Ordering::SeqCst) {
        thread::yield_now();
    }
    thread::sleep(Duration::from_millis(100));

    // While holding page 0, the pool itself must stay usable.
    let _handle1 = bpm.fetch_page(&file, pid1).unwrap();

    drop(guard0);
    drop(handle0);

    child.join().unwrap();
    assert_eq!(bpm.fetch_page(&file, pid0).unwrap().read().payload()[0], 0xC0);
}

// ============================================================================
// Additional: flushFile / disposePage semantics
// ============================================================================

#[test]
fn test_flush_file_evicts_dirty_keeps_clean() {
    let (bpm, file, _dir) = create_bpm(FRAMES);

    let (dirty_pid, mut h) = bpm.new_page(&file).unwrap();
    copy_string(h.write().payload_mut(), "dirty");
    drop(h);
    let (clean_pid, h) = bpm.new_page(&file).unwrap();
    drop(h);

    bpm.flush_file(&file).unwrap();

    assert!(!bpm.is_resident(&file, dirty_pid));
    assert!(bpm.is_resident(&file, clean_pid));
    assert_eq!(bpm.page_count(), 1);

    let h = bpm.fetch_page(&file, dirty_pid).unwrap();
    assert_eq!(read_string(h.read().payload()), "dirty");
}

#[test]
fn test_dispose_page_frees_file_slot() {
    let (bpm, file, _dir) = create_bpm(FRAMES);

    let (pid, h) = bpm.new_page(&file).unwrap();
    drop(h);
    bpm.dispose_page(&file, pid).unwrap();

    assert!(matches!(
        bpm.fetch_page(&file, pid),
        Err(Error::PageNotFound { .. })
    ));

    // The deleted slot is handed out again.
    let (reused, _h) = bpm.new_page(&file).unwrap();
    assert_eq!(reused, PageId::new(0));
}
