mod condition_fold;
mod dispatch;
