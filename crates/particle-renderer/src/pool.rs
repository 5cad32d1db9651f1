//! Reusable instance buffers for the batched renderer

/// Buffers move free -> in use -> in flight -> free. A buffer released this
/// frame only becomes acquirable after `end_frame`, so nothing the current
/// frame's draws reference gets rewritten before submission.
#[derive(Debug)]
pub struct InstanceBufferPool<B> {
    free: Vec<B>,
    in_flight: Vec<B>,
    allocated: usize,
}

impl<B> Default for InstanceBufferPool<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> InstanceBufferPool<B> {
    pub fn new() -> Self {
        Self {
            free: Vec::new(),
            in_flight: Vec::new(),
            allocated: 0,
        }
    }

    /// Reuse a free buffer, or allocate one with `create`
    pub fn acquire(&mut self, create: impl FnOnce() -> B) -> B {
        match self.free.pop() {
            Some(buffer) => buffer,
            None => {
                self.allocated += 1;
                log::debug!("Instance buffer pool grew to {}", self.allocated);
                create()
            }
        }
    }

    pub fn release(&mut self, buffer: B) {
        self.in_flight.push(buffer);
    }

    pub fn end_frame(&mut self) {
        self.free.append(&mut self.in_flight);
    }

    /// Buffers ever created by this pool
    pub fn allocated(&self) -> usize {
        self.allocated
    }

    pub fn available(&self) -> usize {
        self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_frame(pool: &mut InstanceBufferPool<u32>, batches: usize, next_id: &mut u32) {
        let acquired: Vec<u32> = (0..batches)
            .map(|_| {
                pool.acquire(|| {
                    *next_id += 1;
                    *next_id
                })
            })
            .collect();
        for buffer in acquired {
            pool.release(buffer);
        }
        pool.end_frame();
    }

    #[test]
    fn test_steady_state_does_not_grow() {
        let mut pool = InstanceBufferPool::new();
        let mut next_id = 0;

        for _ in 0..100 {
            run_frame(&mut pool, 3, &mut next_id);
        }

        assert_eq!(pool.allocated(), 3);
        assert_eq!(pool.available(), 3);
    }

    #[test]
    fn test_bounded_by_peak_batch_count() {
        let mut pool = InstanceBufferPool::new();
        let mut next_id = 0;
        let counts = [1, 4, 2, 0, 7, 3, 7, 5, 1, 6];

        let mut peak = 0;
        for &count in counts.iter().cycle().take(200) {
            run_frame(&mut pool, count, &mut next_id);
            peak = peak.max(count);
            assert!(pool.allocated() <= peak);
        }
        assert_eq!(pool.allocated(), 7);
    }

    #[test]
    fn test_released_buffers_wait_for_frame_end() {
        let mut pool = InstanceBufferPool::new();
        let first = pool.acquire(|| 1u32);
        pool.release(first);

        // Still in flight: a second acquire this frame must allocate.
        let second = pool.acquire(|| 2u32);
        assert_eq!(second, 2);
        pool.release(second);

        pool.end_frame();
        let reused = pool.acquire(|| 3u32);
        assert!(reused == 1 || reused == 2);
        assert_eq!(pool.allocated(), 2);
    }
}
